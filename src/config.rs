//! Configuration for voicejournal.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (VOICEJOURNAL_DIR, WHISPER_PATH)
//! 2. Config file (.voicejournal/config.yaml)
//! 3. Defaults (~/journal, `whisper` on PATH)
//!
//! Config file discovery:
//! - Searches current directory and parents for .voicejournal/config.yaml
//! - Paths in the config file are relative to the config file's parent directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub whisper: Option<WhisperConfig>,
    #[serde(default)]
    pub capture: Option<CaptureConfigFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Journal directory (relative to config file)
    pub journal: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhisperConfig {
    pub path: Option<String>,
    pub model: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfigFile {
    pub poll_interval_ms: Option<u64>,
    pub max_seconds: Option<u64>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to the journal directory
    pub journal: PathBuf,
    /// Whisper invocation settings
    pub whisper: WhisperSettings,
    /// Capture loop tuning
    pub capture: CaptureTuning,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct WhisperSettings {
    /// Path to the whisper binary
    pub path: String,
    /// Default model when --model is not given
    pub model: String,
    /// Transcription language hint
    pub language: String,
}

impl Default for WhisperSettings {
    fn default() -> Self {
        Self {
            path: "whisper".to_string(),
            model: "base".to_string(),
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaptureTuning {
    /// Interval between capture queue drains
    pub poll_interval_ms: u64,
    /// Optional recording cap in seconds
    pub max_seconds: Option<u64>,
}

impl Default for CaptureTuning {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            max_seconds: None,
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".voicejournal").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    // Default journal directory
    let default_journal = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join("journal");

    // Check for config file
    let config_file = find_config_file();

    let (journal, whisper, capture) = if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;

        // Base directory is the parent of .voicejournal/
        let base_dir = config_path
            .parent()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));

        let journal = if let Ok(env_dir) = std::env::var("VOICEJOURNAL_DIR") {
            PathBuf::from(env_dir)
        } else if let Some(ref journal_path) = config.paths.journal {
            resolve_path(base_dir, journal_path)
        } else {
            default_journal.clone()
        };

        let defaults = WhisperSettings::default();
        let whisper = WhisperSettings {
            path: std::env::var("WHISPER_PATH").ok().unwrap_or_else(|| {
                config
                    .whisper
                    .as_ref()
                    .and_then(|w| w.path.clone())
                    .unwrap_or(defaults.path)
            }),
            model: config
                .whisper
                .as_ref()
                .and_then(|w| w.model.clone())
                .unwrap_or(defaults.model),
            language: config
                .whisper
                .as_ref()
                .and_then(|w| w.language.clone())
                .unwrap_or(defaults.language),
        };

        let tuning_defaults = CaptureTuning::default();
        let capture = CaptureTuning {
            poll_interval_ms: config
                .capture
                .as_ref()
                .and_then(|c| c.poll_interval_ms)
                .unwrap_or(tuning_defaults.poll_interval_ms),
            max_seconds: config.capture.as_ref().and_then(|c| c.max_seconds),
        };

        (journal, whisper, capture)
    } else {
        // No config file - use env vars or defaults
        let journal = std::env::var("VOICEJOURNAL_DIR")
            .map(PathBuf::from)
            .unwrap_or(default_journal);

        let whisper = WhisperSettings {
            path: std::env::var("WHISPER_PATH")
                .unwrap_or_else(|_| WhisperSettings::default().path),
            ..WhisperSettings::default()
        };

        (journal, whisper, CaptureTuning::default())
    };

    Ok(ResolvedConfig {
        journal,
        whisper,
        capture,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the journal directory
pub fn journal_dir() -> Result<PathBuf> {
    Ok(config()?.journal.clone())
}
