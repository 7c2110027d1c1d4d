//! Configuration handling for peoplefs.
//!
//! Loaded from `config.toml` in the XDG config directory unless a path is
//! given on the command line. Every field has a default, so a missing file
//! or a partial one is fine.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Mount configuration
    #[serde(default)]
    pub mount: MountConfig,

    /// Index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// File watching configuration
    #[serde(default)]
    pub watch: WatchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Mount-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MountConfig {
    /// Allow other users to access the mount
    #[serde(default)]
    pub allow_other: bool,
}

/// Index-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index dot-files and dot-directories too
    #[serde(default)]
    pub include_hidden: bool,

    /// exiftool binary to run
    #[serde(default = "default_exiftool")]
    pub exiftool: PathBuf,

    /// Files per exiftool invocation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_exiftool() -> PathBuf {
    PathBuf::from("exiftool")
}

fn default_batch_size() -> usize {
    peoplefs_index::exiftool::DEFAULT_BATCH_SIZE
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            include_hidden: false,
            exiftool: default_exiftool(),
            batch_size: default_batch_size(),
        }
    }
}

/// File watching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Rebuild the index when files change
    #[serde(default = "default_watch_enabled")]
    pub enabled: bool,

    /// Quiet period before a rebuild (ms)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_watch_enabled() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    500
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: default_watch_enabled(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    /// Parse the configured level.
    pub fn level(&self) -> Result<Level> {
        self.level
            .parse()
            .with_context(|| format!("Invalid log level: {:?}", self.level))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// tried and defaults are used if nothing is there.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match default_config_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !required && !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Get the XDG config directory for peoplefs.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("PEOPLEFS_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "peoplefs").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default config file location.
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
