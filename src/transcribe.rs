//! Whisper transcription backend.
//!
//! Shells out to a local whisper binary for transcription. The model is
//! treated as a black box: audio path and model name in, text out.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::config::WhisperSettings;

/// Errors from the transcription collaborator
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("Failed to run whisper: {0}")]
    Launch(#[source] std::io::Error),

    #[error("Whisper failed: {0}")]
    Whisper(String),

    #[error("Failed to read whisper output: {0}")]
    Output(#[source] std::io::Error),

    #[error("Failed to parse whisper JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to create temp dir: {0}")]
    TempDir(#[source] std::io::Error),
}

/// Result of transcription
#[derive(Debug, Clone)]
pub struct TranscriptResult {
    pub text: String,
    pub language: String,
    pub duration_seconds: f64,
}

/// Whisper output JSON structure
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    text: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    end: f64,
}

/// Transcribe audio using the local whisper binary
pub async fn transcribe(
    audio_path: &Path,
    model: &str,
    settings: &WhisperSettings,
) -> Result<TranscriptResult, TranscribeError> {
    // Temp dir for whisper's output files
    let temp_dir = tempfile::tempdir().map_err(TranscribeError::TempDir)?;

    debug!(
        "Running {} on {} (model {})",
        settings.path,
        audio_path.display(),
        model
    );

    let output = Command::new(&settings.path)
        .arg(audio_path)
        .arg("--model")
        .arg(model)
        .arg("--output_dir")
        .arg(temp_dir.path())
        .arg("--output_format")
        .arg("json")
        .arg("--language")
        .arg(&settings.language)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(TranscribeError::Launch)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TranscribeError::Whisper(stderr.trim().to_string()));
    }

    // Whisper writes <stem>.json into the output dir
    let stem = audio_path.file_stem().unwrap_or_default().to_string_lossy();
    let json_path = temp_dir.path().join(format!("{}.json", stem));

    let json_content = tokio::fs::read_to_string(&json_path)
        .await
        .map_err(TranscribeError::Output)?;

    let whisper: WhisperOutput = serde_json::from_str(&json_content)?;

    let duration = whisper.segments.last().map(|s| s.end).unwrap_or(0.0);

    Ok(TranscriptResult {
        text: whisper.text.trim().to_string(),
        language: if whisper.language.is_empty() {
            settings.language.clone()
        } else {
            whisper.language
        },
        duration_seconds: duration,
    })
}
