//! Configuration management for Bedwatch
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.

use crate::error::{BedwatchError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_true() -> bool {
    true
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Home Assistant connection and entity mapping
    pub homeassistant: HomeAssistantConfig,

    /// Nightly time window used for sleep classification
    pub night: NightConfig,

    /// Snapshot cache freshness and refresh cadence
    pub cache: CacheConfig,

    /// Published feed metadata and file locations
    pub feed: FeedConfig,

    /// Web server binding configuration
    pub web: WebConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Home Assistant connection parameters and entity identifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeAssistantConfig {
    /// Base URL of the Home Assistant instance (e.g. http://hass.local:8123)
    pub base_url: String,

    /// Long-lived access token for the REST API
    pub access_token: String,

    /// Bed occupancy binary sensor entity
    pub occupancy_entity: String,

    /// Elapsed-hours counter sensor entity
    pub lazy_counter_entity: String,

    /// Phone interactivity binary sensor entity
    pub phone_entity: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Nightly window boundaries in HH:MM, may span midnight
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NightConfig {
    /// Window start time
    pub start: String,

    /// Window end time
    pub end: String,
}

/// Cache freshness and periodic refresh settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a snapshot stays fresh before a request triggers recomputation
    pub freshness_seconds: u64,

    /// Period of the background refresh trigger; should be >= freshness_seconds
    pub refresh_interval_seconds: u64,
}

/// Feed metadata and on-disk artifact locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Name used in entry titles and descriptions
    pub subject: String,

    /// Feed-level title
    pub title: String,

    /// Feed-level link, also used as the entry link
    pub link: String,

    /// Feed-level description
    pub description: String,

    /// Feed language code
    pub language: String,

    /// Path of the rendered RSS document
    pub xml_path: String,

    /// Path of the durable feed store (JSON)
    pub store_path: String,

    /// Directory served under /static (holds the rendered feed)
    pub public_dir: String,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file or log directory
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    #[serde(default = "default_true")]
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Default for HomeAssistantConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8123".to_string(),
            access_token: String::new(),
            occupancy_entity: "binary_sensor.bed_occupancy".to_string(),
            lazy_counter_entity: "sensor.lazy_counter".to_string(),
            phone_entity: "binary_sensor.phone_interactive".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Default for NightConfig {
    fn default() -> Self {
        Self {
            start: "22:00".to_string(),
            end: "09:00".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            freshness_seconds: 120,
            refresh_interval_seconds: 240,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            subject: "Jstyles".to_string(),
            title: "Is Jstyles being lazy?".to_string(),
            link: "http://lazy.styl.dev".to_string(),
            description: "Is Jstyles being lazy?".to_string(),
            language: "en".to_string(),
            xml_path: "./static/feed.xml".to_string(),
            store_path: "./feed_store.json".to_string(),
            public_dir: "./static".to_string(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/bedwatch.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            homeassistant: HomeAssistantConfig::default(),
            night: NightConfig::default(),
            cache: CacheConfig::default(),
            feed: FeedConfig::default(),
            web: WebConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from default locations, falling back to defaults
    pub fn load() -> Result<Self> {
        let default_paths = [
            "bedwatch_config.yaml",
            "/data/bedwatch_config.yaml",
            "/etc/bedwatch/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides for the Home Assistant connection
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("HOMEASSISTANT_URL")
            && !url.is_empty()
        {
            self.homeassistant.base_url = url;
        }
        if let Ok(token) = std::env::var("HOMEASSISTANT_TOKEN")
            && !token.is_empty()
        {
            self.homeassistant.access_token = token;
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.homeassistant.base_url.is_empty() {
            return Err(BedwatchError::validation(
                "homeassistant.base_url",
                "Base URL cannot be empty",
            ));
        }

        // Startup-fatal: without a token every entity read would 401
        if self.homeassistant.access_token.trim().is_empty() {
            return Err(BedwatchError::validation(
                "homeassistant.access_token",
                "Access token is required (set HOMEASSISTANT_TOKEN)",
            ));
        }

        crate::status::NightWindow::from_config(&self.night)?;

        if self.cache.freshness_seconds == 0 {
            return Err(BedwatchError::validation(
                "cache.freshness_seconds",
                "Must be greater than 0",
            ));
        }

        if self.cache.refresh_interval_seconds < self.cache.freshness_seconds {
            return Err(BedwatchError::validation(
                "cache.refresh_interval_seconds",
                "Must be >= cache.freshness_seconds",
            ));
        }

        if self.web.port == 0 {
            return Err(BedwatchError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        Ok(())
    }
}
