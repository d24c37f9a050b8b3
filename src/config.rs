//! Configuration loading and management.
//!
//! Configuration is loaded with the following precedence:
//! 1. Environment variables (`STINT_*`)
//! 2. Config file (`~/.stint/config.toml`)
//! 3. Defaults

use crate::error::{Error, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,

    /// Recording configuration.
    pub recording: RecordingConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the stint home directory.
    pub path: PathBuf,

    /// Maximum number of stored sessions. Zero disables retention.
    pub max_sessions: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_stint_home(),
            max_sessions: 50,
        }
    }
}

/// Recording configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Workspace-relative paths to ignore (glob syntax).
    pub ignore: Vec<String>,

    /// Seconds between commit polls.
    pub poll_interval_seconds: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            ignore: default_ignore_patterns(),
            poll_interval_seconds: 5,
        }
    }
}

fn default_ignore_patterns() -> Vec<String> {
    [
        "**/.git/**",
        "**/node_modules/**",
        "**/target/**",
        "**/dist/**",
        "**/*.log",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

/// Get the default stint home directory.
fn default_stint_home() -> PathBuf {
    dirs::home_dir().map_or_else(|| PathBuf::from(".stint"), |h| h.join(".stint"))
}

/// Load configuration with precedence: env vars → file → defaults.
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
pub fn load_config() -> Result<Config> {
    let mut config = Config::default();

    let config_path = get_config_path();
    if config_path.exists() {
        let contents = fs::read_to_string(&config_path).map_err(Error::Storage)?;
        config = toml::from_str(&contents).map_err(|e| Error::Config(e.to_string()))?;
    }

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Get the path to the config file.
fn get_config_path() -> PathBuf {
    if let Ok(path) = env::var("STINT_CONFIG") {
        return PathBuf::from(path);
    }

    if let Ok(home) = env::var("STINT_HOME") {
        return PathBuf::from(home).join("config.toml");
    }

    default_stint_home().join("config.toml")
}

/// Apply environment variable overrides to config.
fn apply_env_overrides(config: &mut Config) {
    if let Ok(path) = env::var("STINT_STORAGE_PATH") {
        config.storage.path = PathBuf::from(path);
    } else if let Ok(home) = env::var("STINT_HOME") {
        config.storage.path = PathBuf::from(home);
    }

    if let Ok(val) = env::var("STINT_MAX_SESSIONS") {
        if let Ok(max) = val.parse() {
            config.storage.max_sessions = max;
        }
    }

    if let Ok(val) = env::var("STINT_POLL_INTERVAL_SECONDS") {
        if let Ok(secs) = val.parse() {
            config.recording.poll_interval_seconds = secs;
        }
    }
}
