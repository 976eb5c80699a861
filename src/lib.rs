//! voicejournal - personal voice journal capture
//!
//! Records microphone audio, transcribes it with Whisper, and files both
//! the recording and the transcript as a dated journal entry.
//!
//! # Architecture
//!
//! The capture pipeline is a producer/consumer loop around a device
//! stream:
//! - The audio callback pushes sample chunks onto an internal queue and
//!   does nothing else (no blocking, no I/O)
//! - A foreground polling loop drains the queue until a cancellation
//!   token fires (Ctrl+C or a configured timeout)
//! - On stop the stream is closed, the queue fully drained, and the
//!   result written as a 16-bit PCM WAV
//!
//! # Modules
//!
//! - `capture`: device catalog and capture session (the core)
//! - `transcribe`: Whisper shell-out backend
//! - `journal`: entry ids and journal directory bookkeeping
//! - `notify`: desktop notification dispatch
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Record an entry, stop with Ctrl+C
//! voicejournal record
//!
//! # Pick a specific microphone and model
//! voicejournal record --device 1 --model small
//!
//! # See what's plugged in
//! voicejournal devices
//! ```

pub mod capture;
pub mod cli;
pub mod config;
pub mod journal;
pub mod notify;
pub mod transcribe;

// Re-export main types at crate root for convenience
pub use capture::{
    CancelToken, CaptureConfig, CaptureError, CaptureSession, ChunkSender, InputDevice,
    RecordedAudio, StreamErrorFlag,
};
pub use journal::JournalEntry;
pub use transcribe::{transcribe, TranscribeError, TranscriptResult};
