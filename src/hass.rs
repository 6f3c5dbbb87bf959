//! Home Assistant REST API client
//!
//! Provides point-in-time entity readings for the status deriver. All
//! failures reading an entity surface as `BedwatchError::Sensor` so the
//! caller can decide the fallback.

use crate::config::HomeAssistantConfig;
use crate::error::{BedwatchError, Result};
use crate::logging::get_logger;
use async_trait::async_trait;
use serde::Deserialize;

/// Raw state of one Home Assistant entity at one instant
#[derive(Debug, Clone, Deserialize)]
pub struct EntityState {
    /// Entity identifier (e.g. binary_sensor.bed_occupancy)
    pub entity_id: String,

    /// Raw state value as reported by the platform ("on", "off", "2.5", ...)
    pub state: String,

    /// Last change timestamp as reported by the platform, if present
    #[serde(default)]
    pub last_changed: Option<String>,
}

/// Source of entity readings; implemented by the HTTP client and by test fakes
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Fetch the current state of a single entity
    async fn entity_state(&self, entity_id: &str) -> Result<EntityState>;
}

/// Home Assistant REST API client
pub struct HassClient {
    base_url: String,
    access_token: String,
    http: reqwest::Client,
    logger: crate::logging::StructuredLogger,
}

impl HassClient {
    /// Create a new client from configuration
    pub fn new(config: &HomeAssistantConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            http,
            logger: get_logger("hass"),
        })
    }
}

#[async_trait]
impl SensorSource for HassClient {
    async fn entity_state(&self, entity_id: &str) -> Result<EntityState> {
        use reqwest::header::{ACCEPT, AUTHORIZATION};

        let url = format!("{}/api/states/{}", self.base_url, entity_id);
        let resp = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| BedwatchError::sensor(entity_id.to_string(), e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            self.logger
                .error(&format!("Entity read failed: {} -> {}", entity_id, status));
            return Err(BedwatchError::sensor(
                entity_id.to_string(),
                format!("API returned {}", status),
            ));
        }

        let state: EntityState = resp
            .json()
            .await
            .map_err(|e| BedwatchError::sensor(entity_id.to_string(), e.to_string()))?;

        self.logger
            .debug(&format!("Read {} = {}", state.entity_id, state.state));
        Ok(state)
    }
}
