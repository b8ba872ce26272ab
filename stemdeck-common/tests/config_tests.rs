//! Integration tests for configuration loading and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate STEMDECK_* variables are marked with #[serial].

use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use stemdeck_common::config::{
    reference_manifest, ManifestEntry, TomlConfig, ENV_ASSET_ROOT, ENV_LOG_LEVEL, ENV_PORT,
};
use stemdeck_common::Error;
use tempfile::NamedTempFile;

fn clear_env() {
    env::remove_var(ENV_ASSET_ROOT);
    env::remove_var(ENV_PORT);
    env::remove_var(ENV_LOG_LEVEL);
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes()).expect("Failed to write config");
    file
}

#[test]
fn test_load_full_config_file() {
    let file = write_config(
        r#"
asset_root = "/srv/stems"
port = 6000

[audio]
sample_rate = 48000
look_ahead_ms = 250
output_device = "USB Audio"

[mix]
default_gain = 0.4
trim = 1.0
progress_interval_ms = 100

[logging]
level = "debug"

[[manifest]]
filename = "drums.wav"
label = "Drums"

[[manifest]]
filename = "keys.wav"
label = "Keys"
"#,
    );

    let config = TomlConfig::load(file.path()).expect("Config should load");

    assert_eq!(config.asset_root, PathBuf::from("/srv/stems"));
    assert_eq!(config.port, 6000);
    assert_eq!(config.audio.sample_rate, 48_000);
    assert_eq!(config.audio.look_ahead_ms, 250);
    assert_eq!(config.audio.output_device.as_deref(), Some("USB Audio"));
    assert_eq!(config.audio.buffer_size, None);
    assert_eq!(config.mix.default_gain, 0.4);
    assert_eq!(config.mix.trim, 1.0);
    assert_eq!(config.mix.progress_interval_ms, 100);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.manifest,
        vec![
            ManifestEntry::new("drums.wav", "Drums"),
            ManifestEntry::new("keys.wav", "Keys"),
        ]
    );
}

#[test]
fn test_partial_config_keeps_defaults() {
    let file = write_config("[audio]\nlook_ahead_ms = 50\n");
    let config = TomlConfig::load(file.path()).unwrap();

    assert_eq!(config.audio.look_ahead_ms, 50);
    assert_eq!(config.audio.sample_rate, 44_100);
    assert_eq!(config.mix.default_gain, 0.2);
    assert_eq!(config.manifest, reference_manifest());
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let missing = PathBuf::from("/nonexistent/stemdeck/config.toml");
    let result = TomlConfig::load_or_default(Some(missing.as_path()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_malformed_toml_is_reported() {
    let file = write_config("port = \"not a number\"\n");
    let result = TomlConfig::load(file.path());
    assert!(matches!(result, Err(Error::Toml(_))));
}

#[test]
#[serial]
fn test_env_overrides_take_priority_over_file() {
    clear_env();
    let file = write_config("asset_root = \"/from/file\"\nport = 6000\n");
    let mut config = TomlConfig::load(file.path()).unwrap();

    env::set_var(ENV_ASSET_ROOT, "/from/env");
    env::set_var(ENV_PORT, "7000");
    env::set_var(ENV_LOG_LEVEL, "trace");

    config.apply_env_overrides().unwrap();

    assert_eq!(config.asset_root, PathBuf::from("/from/env"));
    assert_eq!(config.port, 7000);
    assert_eq!(config.logging.level, "trace");

    clear_env();
}

#[test]
#[serial]
fn test_invalid_env_port_is_rejected() {
    clear_env();
    env::set_var(ENV_PORT, "eighty");

    let mut config = TomlConfig::default();
    let result = config.apply_env_overrides();
    assert!(matches!(result, Err(Error::Config(_))));

    clear_env();
}

#[test]
#[serial]
fn test_no_env_leaves_config_untouched() {
    clear_env();
    let mut config = TomlConfig::default();
    let before = config.asset_root.clone();

    config.apply_env_overrides().unwrap();

    assert_eq!(config.asset_root, before);
    assert_eq!(config.port, 5760);
}
