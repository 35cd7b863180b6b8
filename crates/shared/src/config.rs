//! Configuration management for the MangaDex client.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    pub data: DataConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// MangaDex API settings
    pub mangadex: MangaDexConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// MangaDex API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MangaDexConfig {
    /// REST API base URL
    pub api_url: String,

    /// Upload CDN base URL (cover images)
    pub cdn_url: String,

    /// Translated language requested from the chapter feed
    pub language: String,

    /// User agent sent with every request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Scanlation providers whose chapters are never shown
    #[serde(default = "default_excluded_groups")]
    pub excluded_groups: Vec<String>,

    /// Rate limiting settings
    pub rate_limit: RateLimitConfig,

    /// Source preferences
    #[serde(default)]
    pub preferences: PreferencesConfig,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub permits: u32,

    /// Window length in milliseconds
    pub window_ms: u64,
}

/// Toggles normally exposed on the source's preference screen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreferencesConfig {
    /// Use the reduced-quality image set
    pub data_saver: bool,

    /// Only request delivery servers listening on port 443
    pub force_port_443: bool,

    pub content_rating_safe: bool,
    pub content_rating_suggestive: bool,
    pub content_rating_erotica: bool,
    pub content_rating_pornographic: bool,
}

fn default_excluded_groups() -> Vec<String> {
    vec!["MangaPlus".to_string()]
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            data_saver: false,
            force_port_443: false,
            content_rating_safe: true,
            content_rating_suggestive: true,
            content_rating_erotica: false,
            content_rating_pornographic: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                root_dir: "data".to_string(),
            },
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: true,
                json_format: false,
            },
            mangadex: MangaDexConfig {
                api_url: "https://api.mangadex.org".to_string(),
                cdn_url: "https://uploads.mangadex.org".to_string(),
                language: "en".to_string(),
                user_agent: concat!("mangadex-client/", env!("CARGO_PKG_VERSION")).to_string(),
                timeout_secs: 30,
                excluded_groups: default_excluded_groups(),
                rate_limit: RateLimitConfig {
                    permits: 5,
                    window_ms: 1000,
                },
                preferences: PreferencesConfig::default(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Get the path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        let log_path = Path::new(&self.logging.log_dir);
        if log_path.is_absolute() {
            log_path.to_path_buf()
        } else {
            self.data_dir().join(log_path)
        }
    }
}
