//! Microphone capture pipeline.
//!
//! Two pieces, consumed by the CLI glue:
//!
//! 1. **Device catalog** (`device`): enumerates host input devices and
//!    resolves a default or user-selected device to concrete stream
//!    parameters.
//! 2. **Capture session** (`session`): owns one bounded-lifetime input
//!    stream. The cpal callback pushes sample chunks onto an internal
//!    queue; a foreground polling loop drains them until a cancellation
//!    token fires, then the stream is closed, the queue fully drained,
//!    and the result written out as a 16-bit PCM WAV.
//!
//! # Architecture
//!
//! ```text
//! cpal callback → chunk queue → polling loop → RecordedAudio → .wav
//!                                    ↑
//!                              CancelToken (Ctrl+C / timeout)
//! ```

pub mod device;
pub mod session;

pub use device::{list_devices, resolve_device, InputDevice};
pub use session::{
    CancelToken, CaptureConfig, CaptureSession, ChunkSender, RecordedAudio, StreamErrorFlag,
};

use thiserror::Error;

/// Errors that can occur in the capture pipeline
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No audio input devices found")]
    NoInputDevices,

    #[error("Input device {0} not found")]
    DeviceNotFound(usize),

    #[error("Invalid capture config: {0}")]
    InvalidConfig(String),

    #[error("No audio was recorded")]
    NoAudioCaptured,

    #[error("Failed to enumerate audio devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("Failed to query device config: {0}")]
    DeviceConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to open input stream: {0}")]
    StreamOpen(#[from] cpal::BuildStreamError),

    #[error("Failed to start input stream: {0}")]
    StreamStart(#[from] cpal::PlayStreamError),

    #[error("Audio stream failed: {0}")]
    Stream(String),

    #[error("Failed to write recording: {0}")]
    FileWrite(#[from] hound::Error),
}
