//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Staged records per automatic flush during a load
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,

    /// Input lines are silently truncated to this many bytes before parsing
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("kvstash").join("kvstash.db"))
        .unwrap_or_else(|| PathBuf::from("./kvstash.db"))
}

fn default_flush_threshold() -> usize {
    64 * 1024 // records per automatic flush
}

fn default_max_line_bytes() -> usize {
    256
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            flush_threshold: default_flush_threshold(),
            max_line_bytes: default_max_line_bytes(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Errors that can occur loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("cannot parse config {path}: {error}")]
    Parse { path: PathBuf, error: String },
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations, falling back to built-in defaults
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("kvstash").join("config.toml")),
            Some(PathBuf::from("./kvstash.toml")),
        ];

        for path in config_paths.into_iter().flatten() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(mut config) => {
                        config.apply_env_overrides();
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("ignoring config {}: {}", path.display(), e);
                    }
                }
            }
        }

        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Apply `KVSTASH_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(db) = std::env::var("KVSTASH_DB") {
            self.db_path = PathBuf::from(db);
        }
        if let Ok(threshold) = std::env::var("KVSTASH_FLUSH_THRESHOLD") {
            if let Ok(n) = threshold.parse() {
                self.flush_threshold = n;
            }
        }
        if let Ok(max) = std::env::var("KVSTASH_MAX_LINE_BYTES") {
            if let Ok(n) = max.parse() {
                self.max_line_bytes = n;
            }
        }
        if let Ok(level) = std::env::var("KVSTASH_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}
