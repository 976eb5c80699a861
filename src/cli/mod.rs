//! Command-line interface for voicejournal.
//!
//! Provides commands for recording journal entries, listing input
//! devices, browsing past entries, and inspecting configuration.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use crate::capture::{self, CancelToken, CaptureConfig, CaptureSession};
use crate::config;
use crate::journal::{self, JournalEntry};
use crate::notify;
use crate::transcribe::transcribe;

/// voicejournal - record, transcribe, and file voice journal entries
#[derive(Parser, Debug)]
#[command(name = "voicejournal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record and transcribe a journal entry
    Record {
        /// Whisper model to use (default "base", or whisper.model from config)
        #[arg(short, long)]
        model: Option<String>,

        /// Input device id (defaults to the system default input)
        #[arg(short, long)]
        device: Option<usize>,

        /// Stop automatically after this many seconds
        #[arg(long)]
        max_secs: Option<u64>,
    },

    /// List available audio input devices
    Devices,

    /// List recorded journal entries
    Entries {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Record {
                model,
                device,
                max_secs,
            } => execute_record(model, device, max_secs).await,
            Commands::Devices => execute_devices().await,
            Commands::Entries { limit } => execute_entries(limit).await,
            Commands::Config => execute_config().await,
        }
    }
}

/// Record a new journal entry, transcribe it, and file both artifacts
async fn execute_record(
    model: Option<String>,
    device: Option<usize>,
    max_secs: Option<u64>,
) -> Result<()> {
    let cfg = config::config()?;
    let model = model.unwrap_or_else(|| cfg.whisper.model.clone());

    println!("🎙️  Recording journal entry (model: {})", model);

    let journal_dir = journal::ensure_journal_dir().await?;
    let entry = JournalEntry::new(&journal_dir, Local::now());

    // Ctrl+C cancels the capture loop through the shared token
    let token = CancelToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        println!();
        println!("🛑 Stopping recording...");
        ctrl_c_token.cancel();
    });

    let max_duration = max_secs
        .or(cfg.capture.max_seconds)
        .map(Duration::from_secs);
    let poll_interval = Duration::from_millis(cfg.capture.poll_interval_ms);
    let audio_path = entry.audio_path.clone();
    let capture_token = token.clone();

    println!("🔴 Recording... Press Ctrl+C to stop");

    // cpal streams are thread-bound, so the whole capture pipeline runs on
    // one blocking thread: resolve device, bind, record, finalize.
    let recording = tokio::task::spawn_blocking(move || {
        let (info, handle) = capture::resolve_device(device)?;
        println!(
            "   Device: {} ({} ch, {} Hz)",
            info.name, info.max_channels, info.default_sample_rate
        );

        let session = CaptureSession::bind(CaptureConfig::for_device(&info))?
            .with_poll_interval(poll_interval)
            .with_max_duration(max_duration)
            .with_progress(elapsed_ticker());

        session.record(&handle, &audio_path, &capture_token)
    })
    .await
    .context("Capture task panicked")??;

    println!();
    println!(
        "✅ Recording complete ({:.1}s, {} frames)",
        recording.duration_secs(),
        recording.frames()
    );

    println!("📝 Transcribing with Whisper ({})...", model);
    let transcript = transcribe(&entry.audio_path, &model, &cfg.whisper)
        .await
        .with_context(|| {
            format!(
                "Transcription failed; audio retained at {}",
                entry.audio_path.display()
            )
        })?;

    journal::write_transcript(&entry, &transcript.text).await?;

    notify::send("Voice Journal", "Transcription complete!").await;

    println!();
    println!("✅ Journal entry {} completed", entry.id);
    println!("   Audio:      {}", entry.audio_path.display());
    println!("   Transcript: {}", entry.transcript_path.display());
    println!(
        "   Language:   {} ({:.0}s of speech)",
        transcript.language, transcript.duration_seconds
    );

    Ok(())
}

/// Once-per-second elapsed-time line for the capture progress hook
fn elapsed_ticker() -> impl FnMut(Duration) + Send {
    let mut last_secs = u64::MAX;
    move |elapsed: Duration| {
        let secs = elapsed.as_secs();
        if secs != last_secs {
            last_secs = secs;
            print!("\r⏱️  {}s elapsed", secs);
            let _ = std::io::stdout().flush();
        }
    }
}

/// List available input devices
async fn execute_devices() -> Result<()> {
    let devices = tokio::task::spawn_blocking(capture::list_devices)
        .await
        .context("Device query task panicked")??;

    if devices.is_empty() {
        println!("No audio input devices found");
        return Ok(());
    }

    println!();
    println!(
        "{:<4} {:<40} {:>8} {:>12}",
        "ID", "NAME", "CHANNELS", "SAMPLE RATE"
    );
    println!("{}", "-".repeat(68));

    for device in &devices {
        let name = truncate_name(&device.name);

        println!(
            "{:<4} {:<40} {:>8} {:>9} Hz",
            device.id, name, device.max_channels, device.default_sample_rate
        );
    }

    println!();
    println!("Total: {} device(s)", devices.len());

    Ok(())
}

/// Truncate a device name for table display. Host-reported names can be
/// non-ASCII, so the cut lands on a character boundary, never mid-byte.
fn truncate_name(name: &str) -> String {
    if name.chars().count() > 38 {
        let head: String = name.chars().take(35).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

/// List journal entries
async fn execute_entries(limit: usize) -> Result<()> {
    let journal_dir = config::journal_dir()?;

    if !journal_dir.exists() {
        println!("Journal is empty. Use 'voicejournal record' to create an entry.");
        return Ok(());
    }

    let entries = journal::list_entries(&journal_dir)?;

    if entries.is_empty() {
        println!("Journal is empty. Use 'voicejournal record' to create an entry.");
        return Ok(());
    }

    println!();
    println!("{:<18} {:<12} {:<40}", "ID", "TRANSCRIPT", "AUDIO");
    println!("{}", "-".repeat(72));

    for entry in entries.iter().take(limit) {
        let transcript = if entry.has_transcript() { "yes" } else { "-" };
        println!(
            "{:<18} {:<12} {:<40}",
            entry.id,
            transcript,
            entry.audio_path.display()
        );
    }

    let total = entries.len();
    if total > limit {
        println!();
        println!("  (showing {} of {} entries)", limit, total);
    }

    Ok(())
}

/// Show the resolved configuration (for debugging)
async fn execute_config() -> Result<()> {
    let cfg = config::config()?;

    println!();
    println!("Voice Journal Configuration");
    println!("══════════════════════════════════════════════════════════════");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Journal: {}", cfg.journal.display());
    println!();
    println!("Whisper:");
    println!("  Binary:   {}", cfg.whisper.path);
    println!("  Model:    {}", cfg.whisper.model);
    println!("  Language: {}", cfg.whisper.language);
    println!();
    println!("Capture:");
    println!("  Poll interval: {} ms", cfg.capture.poll_interval_ms);
    match cfg.capture.max_seconds {
        Some(secs) => println!("  Max duration:  {} s", secs),
        None => println!("  Max duration:  (until Ctrl+C)"),
    }
    println!();

    if cfg.journal.exists() {
        println!("✓ Journal directory exists");
    } else {
        println!("ℹ️  Journal directory will be created on first recording");
    }

    Ok(())
}
