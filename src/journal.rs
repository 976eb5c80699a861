//! Journal entry bookkeeping.
//!
//! An entry is a timestamp-named pair of files in the journal directory:
//! `<id>.wav` (the recording) and `<id>.txt` (the transcript). Entries are
//! never mutated after creation and nothing here deletes anything.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::config;

/// One journal entry: a recording and its transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    /// Timestamp-derived identifier (e.g. `20260824_143502`)
    pub id: String,

    /// Path to the recorded audio file
    pub audio_path: PathBuf,

    /// Path the transcript is (or will be) written to
    pub transcript_path: PathBuf,
}

impl JournalEntry {
    /// Build the entry for a recording starting at `started_at`.
    pub fn new(journal_dir: &Path, started_at: DateTime<Local>) -> Self {
        let id = started_at.format("%Y%m%d_%H%M%S").to_string();
        Self {
            audio_path: journal_dir.join(format!("{}.wav", id)),
            transcript_path: journal_dir.join(format!("{}.txt", id)),
            id,
        }
    }

    /// Whether the transcript file exists on disk.
    pub fn has_transcript(&self) -> bool {
        self.transcript_path.exists()
    }
}

/// Resolve the journal directory from config and create it on first use.
pub async fn ensure_journal_dir() -> Result<PathBuf> {
    let dir = config::journal_dir()?;

    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create journal directory: {}", dir.display()))?;

    Ok(dir)
}

/// Write the transcript for an entry, content exactly as returned by the
/// transcription backend.
pub async fn write_transcript(entry: &JournalEntry, text: &str) -> Result<()> {
    tokio::fs::write(&entry.transcript_path, text)
        .await
        .with_context(|| {
            format!(
                "Failed to write transcript: {}",
                entry.transcript_path.display()
            )
        })
}

/// List entries in a journal directory, newest first.
///
/// An entry is any `.wav` file; the transcript path is derived from it
/// whether or not the transcript exists yet.
pub fn list_entries(journal_dir: &Path) -> Result<Vec<JournalEntry>> {
    let mut entries = Vec::new();

    let read_dir = std::fs::read_dir(journal_dir)
        .with_context(|| format!("Failed to read journal directory: {}", journal_dir.display()))?;

    for dir_entry in read_dir {
        let path = dir_entry?.path();
        if path.extension().map(|e| e == "wav").unwrap_or(false) {
            let id = match path.file_stem() {
                Some(stem) => stem.to_string_lossy().to_string(),
                None => continue,
            };
            entries.push(JournalEntry {
                transcript_path: path.with_extension("txt"),
                audio_path: path,
                id,
            });
        }
    }

    entries.sort_by(|a, b| b.id.cmp(&a.id));

    Ok(entries)
}
