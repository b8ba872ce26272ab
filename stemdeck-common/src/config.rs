//! Configuration loading for StemDeck
//!
//! Bootstrap configuration lives in a single TOML file. Settings are resolved
//! in this priority order (highest first):
//!
//! 1. Command-line arguments (applied by the binary via clap)
//! 2. Environment variables (`STEMDECK_*`, see [`TomlConfig::apply_env_overrides`])
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants below)
//!
//! A missing configuration file is not an error: the loader logs a warning
//! and continues with compiled defaults.

use crate::timing::{DEFAULT_LOOK_AHEAD_MS, REFERENCE_SAMPLE_RATE};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Fader level a track starts at, and the level unmute restores
pub const DEFAULT_GAIN: f32 = 0.2;

/// Pre-fader trim applied to every track
pub const DEFAULT_TRIM: f32 = 0.5;

/// Environment variable overriding `asset_root`
pub const ENV_ASSET_ROOT: &str = "STEMDECK_ASSET_ROOT";

/// Environment variable overriding `port`
pub const ENV_PORT: &str = "STEMDECK_PORT";

/// Environment variable overriding `logging.level`
pub const ENV_LOG_LEVEL: &str = "STEMDECK_LOG_LEVEL";

/// One (filename, label) pair of the load manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// File name resolved against the asset root
    pub filename: String,
    /// Human-readable track label (instrument name)
    pub label: String,
}

impl ManifestEntry {
    pub fn new(filename: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            label: label.into(),
        }
    }
}

/// The four-stem reference manifest
pub fn reference_manifest() -> Vec<ManifestEntry> {
    vec![
        ManifestEntry::new("syn_34.wav", "Synthesizer"),
        ManifestEntry::new("Audio 10_07.wav", "Lead Synth"),
        ManifestEntry::new("Audio 11_06.wav", "Pad"),
        ManifestEntry::new("bs_10.wav", "Bass"),
    ]
}

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Directory the manifest file names are resolved against
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,

    /// HTTP control port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub mix: MixConfig,

    /// Ordered load manifest
    #[serde(default = "reference_manifest")]
    pub manifest: Vec<ManifestEntry>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Audio graph settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Operating sample rate of the audio graph (Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Synchronization horizon added to the graph clock on play (ms)
    #[serde(default = "default_look_ahead_ms")]
    pub look_ahead_ms: u64,

    /// Output device name (None = system default)
    #[serde(default)]
    pub output_device: Option<String>,

    /// Output buffer size in frames (None = device default)
    #[serde(default)]
    pub buffer_size: Option<u32>,
}

/// Mix policy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixConfig {
    /// Initial fader level, also restored on unmute
    #[serde(default = "default_gain")]
    pub default_gain: f32,

    /// Pre-fader trim
    #[serde(default = "default_trim")]
    pub trim: f32,

    /// Interval between PlaybackProgress events on the SSE stream (ms)
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_asset_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("stemdeck").join("stems"))
        .unwrap_or_else(|| PathBuf::from("./assets"))
}

fn default_port() -> u16 {
    5760
}

fn default_sample_rate() -> u32 {
    REFERENCE_SAMPLE_RATE
}

fn default_look_ahead_ms() -> u64 {
    DEFAULT_LOOK_AHEAD_MS
}

fn default_gain() -> f32 {
    DEFAULT_GAIN
}

fn default_trim() -> f32 {
    DEFAULT_TRIM
}

fn default_progress_interval_ms() -> u64 {
    250
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            look_ahead_ms: default_look_ahead_ms(),
            output_device: None,
            buffer_size: None,
        }
    }
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            default_gain: default_gain(),
            trim: default_trim(),
            progress_interval_ms: default_progress_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            asset_root: default_asset_root(),
            port: default_port(),
            audio: AudioConfig::default(),
            mix: MixConfig::default(),
            manifest: reference_manifest(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration with graceful degradation
    ///
    /// An explicitly requested file must exist. Without one, the platform
    /// config location is tried; if it is absent, compiled defaults are used.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                warn!(
                    "No config file at {}, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply `STEMDECK_*` environment overrides on top of file/default values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(root) = std::env::var(ENV_ASSET_ROOT) {
            if !root.is_empty() {
                self.asset_root = PathBuf::from(root);
            }
        }

        if let Ok(port) = std::env::var(ENV_PORT) {
            self.port = port.parse().map_err(|_| {
                Error::Config(format!("{} must be a port number, got '{}'", ENV_PORT, port))
            })?;
        }

        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }

        Ok(())
    }

    /// Validate value ranges that would make the engine unusable
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(Error::Config("audio.sample_rate must be > 0".to_string()));
        }
        if self.audio.look_ahead_ms == 0 {
            return Err(Error::Config("audio.look_ahead_ms must be > 0".to_string()));
        }
        if self.mix.progress_interval_ms == 0 {
            return Err(Error::Config(
                "mix.progress_interval_ms must be > 0".to_string(),
            ));
        }
        if self.manifest.is_empty() {
            return Err(Error::Config("manifest must list at least one track".to_string()));
        }
        if let Some(entry) = self.manifest.iter().find(|e| e.filename.trim().is_empty()) {
            return Err(Error::Config(format!(
                "manifest entry '{}' has an empty filename",
                entry.label
            )));
        }
        Ok(())
    }
}

/// Platform config file location: `<config_dir>/stemdeck/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stemdeck").join("config.toml"))
}
