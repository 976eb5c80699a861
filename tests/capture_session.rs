//! Capture Session Integration Tests
//!
//! Drives the session state machine through the public chunk-sender path,
//! the same path the stream callback uses, so no audio hardware is needed.

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use voicejournal::{CancelToken, CaptureConfig, CaptureError, CaptureSession, InputDevice};

fn test_device() -> InputDevice {
    InputDevice {
        id: 0,
        name: "Mic".to_string(),
        max_channels: 1,
        default_sample_rate: 44100,
    }
}

fn bind_session() -> CaptureSession {
    let config = CaptureConfig::for_device(&test_device());
    CaptureSession::bind(config)
        .unwrap()
        .with_poll_interval(Duration::from_millis(1))
}

/// Run the loop, close out the session, and finalize to a WAV file.
fn run_to_file(
    mut session: CaptureSession,
    token: &CancelToken,
    path: &Path,
) -> Result<voicejournal::RecordedAudio, CaptureError> {
    let failure = session.capture_loop(token);
    assert!(failure.is_none(), "no stream error expected: {:?}", failure);
    session.close_out(failure, path)
}

#[test]
fn test_chunks_concatenate_in_arrival_order() {
    let temp = TempDir::new().unwrap();
    let wav_path = temp.path().join("order.wav");

    let session = bind_session();
    let sender = session.chunk_sender();
    let token = CancelToken::new();

    // Each chunk carries a distinct constant so ordering is observable
    for i in 0..5 {
        sender.push(vec![i as f32 / 10.0; 100]);
    }
    token.cancel();

    let audio = run_to_file(session, &token, &wav_path).unwrap();

    assert_eq!(audio.samples.len(), 500);
    for i in 0..5 {
        let expected = i as f32 / 10.0;
        assert!(
            audio.samples[i * 100..(i + 1) * 100]
                .iter()
                .all(|&s| s == expected),
            "chunk {} out of order",
            i
        );
    }
}

#[test]
fn test_one_second_scenario_has_expected_frame_count() {
    // 10 chunks of 4410 frames each at 44100 Hz mono = 1 second
    let temp = TempDir::new().unwrap();
    let wav_path = temp.path().join("second.wav");

    let session = bind_session();
    let sender = session.chunk_sender();
    let token = CancelToken::new();

    for _ in 0..10 {
        sender.push(vec![0.25; 4410]);
    }
    token.cancel();

    let audio = run_to_file(session, &token, &wav_path).unwrap();

    assert_eq!(audio.frames(), 44100);
    assert!((audio.duration_secs() - 1.0).abs() < 1e-9);
}

#[test]
fn test_cancel_before_any_chunk_is_no_audio_captured() {
    let temp = TempDir::new().unwrap();
    let wav_path = temp.path().join("empty.wav");

    let mut session = bind_session();
    let token = CancelToken::new();
    token.cancel();

    assert!(session.capture_loop(&token).is_none());
    session.drain_remaining();

    let result = session.finalize(&wav_path);
    assert!(matches!(result, Err(CaptureError::NoAudioCaptured)));
    assert!(!wav_path.exists());
}

#[test]
fn test_double_cancel_matches_single_cancel() {
    let temp = TempDir::new().unwrap();

    let run = |cancel_twice: bool| {
        let session = bind_session();
        let sender = session.chunk_sender();
        let token = CancelToken::new();

        sender.push(vec![0.5; 256]);
        token.cancel();
        if cancel_twice {
            token.cancel();
        }

        let path = temp
            .path()
            .join(if cancel_twice { "twice.wav" } else { "once.wav" });
        run_to_file(session, &token, &path).unwrap()
    };

    let once = run(false);
    let twice = run(true);

    assert_eq!(once.samples, twice.samples);
    assert_eq!(once.frames(), 256);
}

#[test]
fn test_final_drain_accounts_for_chunks_queued_after_loop_exit() {
    // Chunks that land in the queue between loop exit and stream closure
    // must survive into the finalized recording.
    let temp = TempDir::new().unwrap();
    let wav_path = temp.path().join("late.wav");

    let mut session = bind_session();
    let sender = session.chunk_sender();
    let token = CancelToken::new();

    sender.push(vec![0.1; 100]);
    token.cancel();
    assert!(session.capture_loop(&token).is_none());

    // Loop has exited; these arrive before the final drain
    sender.push(vec![0.2; 100]);
    sender.push(vec![0.3; 100]);
    session.drain_remaining();

    let audio = session.finalize(&wav_path).unwrap();
    assert_eq!(audio.samples.len(), 300);
    assert!(audio.samples[200..].iter().all(|&s| s == 0.3));
}

#[test]
fn test_concurrent_producer_is_drained_completely() {
    let temp = TempDir::new().unwrap();
    let wav_path = temp.path().join("threaded.wav");

    let session = bind_session();
    let sender = session.chunk_sender();
    let token = CancelToken::new();

    // Producer thread mimics the audio callback context
    let producer_token = token.clone();
    let producer = std::thread::spawn(move || {
        for _ in 0..20 {
            sender.push(vec![0.5; 441]);
            std::thread::sleep(Duration::from_millis(1));
        }
        producer_token.cancel();
    });

    let audio = run_to_file(session, &token, &wav_path).unwrap();
    producer.join().unwrap();

    assert_eq!(audio.samples.len(), 20 * 441);
}

#[test]
fn test_wav_round_trip_preserves_format_and_count() {
    let temp = TempDir::new().unwrap();
    let wav_path = temp.path().join("roundtrip.wav");

    let session = bind_session();
    let sender = session.chunk_sender();
    let token = CancelToken::new();

    // A ramp through the full sample range, including clipping extremes
    let chunk: Vec<f32> = (0..1000).map(|i| (i as f32 / 500.0) - 1.0).collect();
    sender.push(chunk.clone());
    token.cancel();

    let audio = run_to_file(session, &token, &wav_path).unwrap();

    let reader = hound::WavReader::open(&wav_path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);

    let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
    assert_eq!(samples.len(), audio.samples.len());

    // PCM quantization only: each sample within one 16-bit step
    for (&original, &read_back) in audio.samples.iter().zip(&samples) {
        let restored = read_back as f32 / i16::MAX as f32;
        assert!(
            (original.clamp(-1.0, 1.0) - restored).abs() < 2.0 / i16::MAX as f32,
            "sample drifted beyond quantization: {} vs {}",
            original,
            restored
        );
    }
}

#[test]
fn test_stream_failure_salvages_queued_chunks_as_partial_result() {
    let temp = TempDir::new().unwrap();
    let wav_path = temp.path().join("partial.wav");

    let mut session = bind_session();
    let sender = session.chunk_sender();
    let errors = session.error_flag();
    let token = CancelToken::new();

    // Two chunks land, then the device goes away mid-recording
    sender.push(vec![0.4; 441]);
    sender.push(vec![0.6; 441]);
    errors.raise("device disconnected");

    let failure = session.capture_loop(&token);
    assert_eq!(failure.as_deref(), Some("device disconnected"));

    let result = session.close_out(failure, &wav_path);
    assert!(matches!(result, Err(CaptureError::Stream(_))));

    // Queued chunks were still drained and written as a partial recording
    let reader = hound::WavReader::open(&wav_path).unwrap();
    assert_eq!(reader.len(), 882);
}

#[test]
fn test_stream_failure_with_empty_queue_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let wav_path = temp.path().join("nothing.wav");

    let mut session = bind_session();
    let errors = session.error_flag();
    let token = CancelToken::new();

    errors.raise("device disconnected");

    let failure = session.capture_loop(&token);
    let result = session.close_out(failure, &wav_path);

    assert!(matches!(result, Err(CaptureError::Stream(_))));
    assert!(!wav_path.exists());
}

#[test]
fn test_timeout_cancels_through_the_shared_token() {
    let temp = TempDir::new().unwrap();
    let wav_path = temp.path().join("timeout.wav");

    let config = CaptureConfig::for_device(&test_device());
    let mut session = CaptureSession::bind(config)
        .unwrap()
        .with_poll_interval(Duration::from_millis(1))
        .with_max_duration(Some(Duration::from_millis(20)));

    let sender = session.chunk_sender();
    sender.push(vec![0.5; 64]);

    // Never cancelled externally; the deadline must fire
    let token = CancelToken::new();
    assert!(session.capture_loop(&token).is_none());
    assert!(token.is_cancelled(), "timeout should cancel the shared token");

    session.drain_remaining();
    let audio = session.finalize(&wav_path).unwrap();
    assert_eq!(audio.samples.len(), 64);
}

#[test]
fn test_progress_observer_runs_once_per_iteration() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let calls = Arc::new(AtomicUsize::new(0));
    let observed = Arc::clone(&calls);

    let config = CaptureConfig::for_device(&test_device());
    let mut session = CaptureSession::bind(config)
        .unwrap()
        .with_poll_interval(Duration::from_millis(1))
        .with_progress(move |_elapsed| {
            observed.fetch_add(1, Ordering::SeqCst);
        });

    let token = CancelToken::new();
    token.cancel();
    session.capture_loop(&token);

    // Cancelled before start: exactly the one iteration ran
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
