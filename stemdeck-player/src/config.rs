//! stemdeck-player runtime configuration
//!
//! Resolved from the shared [`TomlConfig`] once at startup; the transport
//! only sees the values it needs.

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;
use stemdeck_common::config::{ManifestEntry, TomlConfig, DEFAULT_GAIN, DEFAULT_TRIM};
use stemdeck_common::timing::DEFAULT_LOOK_AHEAD_MS;

/// Transport policy values
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Synchronization horizon added to the graph clock on play (ms)
    pub look_ahead_ms: u64,
    /// Fader level for new tracks, restored on unmute
    pub default_gain: f32,
    /// Pre-fader trim for new tracks
    pub trim: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            look_ahead_ms: DEFAULT_LOOK_AHEAD_MS,
            default_gain: DEFAULT_GAIN,
            trim: DEFAULT_TRIM,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.look_ahead_ms == 0 {
            return Err(Error::Config("look_ahead_ms must be > 0".to_string()));
        }
        if !self.default_gain.is_finite() || !self.trim.is_finite() {
            return Err(Error::Config("gain and trim must be finite".to_string()));
        }
        Ok(())
    }
}

impl From<&TomlConfig> for EngineConfig {
    fn from(config: &TomlConfig) -> Self {
        Self {
            look_ahead_ms: config.audio.look_ahead_ms,
            default_gain: config.mix.default_gain,
            trim: config.mix.trim,
        }
    }
}

/// Everything the binary needs after CLI, environment and file are merged
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub asset_root: PathBuf,
    pub port: u16,
    pub sample_rate: u32,
    pub output_device: Option<String>,
    pub buffer_size: Option<u32>,
    pub progress_interval: Duration,
    pub manifest: Vec<ManifestEntry>,
    pub engine: EngineConfig,
}

impl PlayerConfig {
    pub fn from_toml(config: &TomlConfig) -> Result<Self> {
        let engine = EngineConfig::from(config);
        engine.validate()?;

        Ok(Self {
            asset_root: config.asset_root.clone(),
            port: config.port,
            sample_rate: config.audio.sample_rate,
            output_device: config.audio.output_device.clone(),
            buffer_size: config.audio.buffer_size,
            progress_interval: Duration::from_millis(config.mix.progress_interval_ms),
            manifest: config.manifest.clone(),
            engine,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.look_ahead_ms, 100);
        assert_eq!(config.default_gain, 0.2);
        assert_eq!(config.trim, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_look_ahead_rejected() {
        let config = EngineConfig {
            look_ahead_ms: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_player_config_from_toml() {
        let toml = TomlConfig::from_toml_str(
            r#"
port = 6000

[audio]
look_ahead_ms = 50
output_device = "Speakers"

[mix]
default_gain = 0.3
progress_interval_ms = 500
"#,
        )
        .unwrap();

        let config = PlayerConfig::from_toml(&toml).unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.output_device.as_deref(), Some("Speakers"));
        assert_eq!(config.progress_interval, Duration::from_millis(500));
        assert_eq!(config.engine.look_ahead_ms, 50);
        assert_eq!(config.engine.default_gain, 0.3);
        assert_eq!(config.manifest.len(), 4);
    }
}
