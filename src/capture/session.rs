//! Capture session: one bounded-lifetime recording from one input device.
//!
//! The session lifecycle is `bind` → `record` → finalized WAV on disk.
//! Internally `record` composes the state machine steps: open the stream,
//! run the polling loop until the cancellation token fires, close the
//! stream, drain whatever is still queued, then materialize the result.
//! The step methods are public so the loop can be exercised without
//! touching real hardware — chunks are fed through a [`ChunkSender`], the
//! same path the cpal callback uses.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use hound::{WavSpec, WavWriter};
use tracing::{info, warn};

use super::{CaptureError, InputDevice};

/// Default interval between queue drains in the polling loop.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cancellation token shared between the polling loop and whoever decides
/// the recording is over (Ctrl+C handler, duration timeout, caller).
///
/// Cancelling is idempotent; setting it twice is the same as once.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the capture loop to stop. Safe to call from any thread.
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

/// Stream parameters for one session, derived once from a chosen device
/// and fixed for the session's lifetime.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// The device this session is bound to
    pub device: InputDevice,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel count (1 or 2)
    pub channels: u16,
}

impl CaptureConfig {
    /// Derive a config from a device snapshot: the device's default sample
    /// rate, channels clamped to mono or stereo.
    pub fn for_device(device: &InputDevice) -> Self {
        Self {
            sample_rate: device.default_sample_rate,
            channels: device.max_channels.min(2),
            device: device.clone(),
        }
    }
}

/// Producer handle for the session's chunk queue.
///
/// The input-stream callback holds one of these and does nothing but push;
/// no blocking, no I/O, to avoid audio dropouts. Tests use the same handle
/// to feed synthetic chunks.
#[derive(Clone)]
pub struct ChunkSender {
    tx: Sender<Vec<f32>>,
}

impl ChunkSender {
    /// Hand one interleaved chunk to the session. Never blocks.
    pub fn push(&self, chunk: Vec<f32>) {
        // A send error means the session is gone; the chunk is moot.
        let _ = self.tx.send(chunk);
    }
}

/// Handle for reporting a stream failure to the polling loop.
///
/// The input-stream error callback holds one of these; only the first
/// reported failure is kept. Like [`ChunkSender`], it is also the seam
/// through which stream failures are simulated in tests.
#[derive(Clone)]
pub struct StreamErrorFlag {
    inner: Arc<Mutex<Option<String>>>,
}

impl StreamErrorFlag {
    /// Record a stream failure. Later reports are ignored.
    pub fn raise(&self, message: impl Into<String>) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.get_or_insert_with(|| message.into());
        }
    }
}

/// Progress observer, invoked once per poll iteration with elapsed time.
pub type ProgressFn = Box<dyn FnMut(Duration) + Send>;

/// The finished recording: every captured chunk concatenated in arrival
/// order, interleaved f32 samples.
#[derive(Debug, Clone)]
pub struct RecordedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl RecordedAudio {
    /// Frame count (one frame = one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Write as 16-bit PCM WAV at the recording's rate and channel count.
    fn write_wav(&self, path: &Path) -> Result<(), CaptureError> {
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            let quantized = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(quantized)?;
        }
        writer.finalize()?;

        Ok(())
    }
}

/// One recording session. Constructed with [`CaptureSession::bind`],
/// consumed by [`CaptureSession::record`] or [`CaptureSession::finalize`];
/// a new session must be built for another recording.
pub struct CaptureSession {
    config: CaptureConfig,
    poll_interval: Duration,
    max_duration: Option<Duration>,
    progress: Option<ProgressFn>,
    tx: Sender<Vec<f32>>,
    rx: Receiver<Vec<f32>>,
    chunks: Vec<Vec<f32>>,
    stream_error: Arc<Mutex<Option<String>>>,
}

impl CaptureSession {
    /// Validate the config and set up the chunk queue. No hardware is
    /// touched until [`record`](Self::record).
    pub fn bind(config: CaptureConfig) -> Result<Self, CaptureError> {
        if config.channels == 0 || config.channels > 2 {
            return Err(CaptureError::InvalidConfig(format!(
                "channels must be 1 or 2, got {}",
                config.channels
            )));
        }
        if config.sample_rate == 0 {
            return Err(CaptureError::InvalidConfig(
                "sample rate must be positive".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel();

        Ok(Self {
            config,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_duration: None,
            progress: None,
            tx,
            rx,
            chunks: Vec::new(),
            stream_error: Arc::new(Mutex::new(None)),
        })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Interval between queue drains (default 100 ms).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Stop automatically after this long. Shares the same cancellation
    /// path as an external cancel.
    pub fn with_max_duration(mut self, max: Option<Duration>) -> Self {
        self.max_duration = max;
        self
    }

    /// Observer called once per poll iteration with elapsed time.
    pub fn with_progress(mut self, progress: impl FnMut(Duration) + Send + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Producer handle for this session's queue: wired into the stream
    /// callback, or used directly to feed chunks in tests.
    pub fn chunk_sender(&self) -> ChunkSender {
        ChunkSender {
            tx: self.tx.clone(),
        }
    }

    /// Failure handle for this session: wired into the stream's error
    /// callback, or used directly to simulate a stream failure in tests.
    pub fn error_flag(&self) -> StreamErrorFlag {
        StreamErrorFlag {
            inner: Arc::clone(&self.stream_error),
        }
    }

    /// Record until cancelled, then write the result to `path`.
    ///
    /// On a mid-recording stream failure the session still drains whatever
    /// was queued and salvages it to `path` best-effort before surfacing
    /// the error.
    pub fn record(
        mut self,
        device: &cpal::Device,
        path: &Path,
        token: &CancelToken,
    ) -> Result<RecordedAudio, CaptureError> {
        let stream = self.open_stream(device)?;
        stream.play()?;

        info!(
            "Recording from '{}' at {} Hz, {} channel(s)",
            self.config.device.name, self.config.sample_rate, self.config.channels
        );

        let failure = self.capture_loop(token);

        // Closing the stream first guarantees no chunk is produced after
        // this point, so the final drain accounts for everything in flight.
        drop(stream);
        self.close_out(failure, path)
    }

    /// Close out the session after the stream is gone: drain whatever is
    /// still queued, then finalize to `path`.
    ///
    /// `failure` is the stream error returned by [`capture_loop`]
    /// (`Self::capture_loop`), if any. On failure the queued chunks are
    /// still salvaged to `path` best-effort before the error is surfaced.
    pub fn close_out(
        mut self,
        failure: Option<String>,
        path: &Path,
    ) -> Result<RecordedAudio, CaptureError> {
        self.drain_remaining();

        if let Some(err) = failure {
            if !self.chunks.is_empty() {
                match self.finalize(path) {
                    Ok(audio) => warn!(
                        "Stream failed; salvaged {} frames to {}",
                        audio.frames(),
                        path.display()
                    ),
                    Err(e) => warn!("Stream failed; could not salvage partial audio: {}", e),
                }
            }
            return Err(CaptureError::Stream(err));
        }

        self.finalize(path)
    }

    /// Poll until the token is cancelled or the stream reports an error.
    ///
    /// Each iteration drains available chunks, invokes the progress
    /// observer, and sleeps for the poll interval. Returns the stream
    /// error message if the stream failed, `None` on a normal stop.
    pub fn capture_loop(&mut self, token: &CancelToken) -> Option<String> {
        let started = Instant::now();
        let deadline = self.max_duration.map(|d| started + d);

        loop {
            self.drain_available();

            if let Some(progress) = self.progress.as_mut() {
                progress(started.elapsed());
            }

            if let Some(err) = self.take_stream_error() {
                return Some(err);
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    token.cancel();
                }
            }

            if token.is_cancelled() {
                return None;
            }

            std::thread::sleep(self.poll_interval);
        }
    }

    /// Drain any chunks still queued. Call after the stream is closed to
    /// account for every chunk produced before closure.
    pub fn drain_remaining(&mut self) {
        self.drain_available();
    }

    /// Concatenate accumulated chunks in arrival order and write a 16-bit
    /// PCM WAV to `path`. Consumes the session; it cannot be restarted.
    pub fn finalize(self, path: &Path) -> Result<RecordedAudio, CaptureError> {
        let total: usize = self.chunks.iter().map(Vec::len).sum();
        if total == 0 {
            return Err(CaptureError::NoAudioCaptured);
        }

        let mut samples = Vec::with_capacity(total);
        for chunk in &self.chunks {
            samples.extend_from_slice(chunk);
        }

        let audio = RecordedAudio {
            samples,
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
        };

        audio.write_wav(path)?;

        info!(
            "Wrote {} frames ({:.1}s) to {}",
            audio.frames(),
            audio.duration_secs(),
            path.display()
        );

        Ok(audio)
    }

    /// Non-blocking drain of everything currently in the queue.
    fn drain_available(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => self.chunks.push(chunk),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn take_stream_error(&self) -> Option<String> {
        match self.stream_error.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => Some("audio stream poisoned its error flag".to_string()),
        }
    }

    /// Open the input stream with the bound config. The callback only
    /// pushes to the queue; errors are recorded for the polling loop.
    fn open_stream(&self, device: &cpal::Device) -> Result<cpal::Stream, CaptureError> {
        let sample_format = device.default_input_config()?.sample_format();

        let stream_config = StreamConfig {
            channels: self.config.channels,
            sample_rate: cpal::SampleRate(self.config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let sender = self.chunk_sender();
        let error_flag = self.error_flag();
        let on_error = move |err: cpal::StreamError| {
            warn!("Audio stream error: {}", err);
            error_flag.raise(err.to_string());
        };

        let stream = match sample_format {
            SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    sender.push(data.to_vec());
                },
                on_error,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<f32> =
                        data.iter().map(|&s| s as f32 / 32768.0).collect();
                    sender.push(converted);
                },
                on_error,
                None,
            )?,
            other => {
                return Err(CaptureError::Stream(format!(
                    "unsupported sample format {:?} (need F32 or I16)",
                    other
                )))
            }
        };

        Ok(stream)
    }
}
