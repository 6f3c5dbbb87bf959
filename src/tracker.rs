//! Snapshot cache and change-detection orchestration
//!
//! The tracker owns the single mutable cache state: the last snapshot and
//! the previously observed status flags. Both the web handlers and the
//! periodic refresh trigger go through `current`, and the whole
//! check-freshness / derive / compare / emit / commit path runs under one
//! `Arc<Mutex<_>>` so concurrent triggers cannot double-emit an entry or
//! overwrite a fresh snapshot with a stale one.

use crate::config::Config;
use crate::error::Result;
use crate::feed::FeedPublisher;
use crate::hass::SensorSource;
use crate::logging::get_logger;
use crate::status::{NightWindow, StatusFlags, StatusSnapshot, derive_snapshot};
use chrono::{Duration, Local, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Tracker handle shared between the web server and the refresh loop
pub type SharedTracker = Arc<Mutex<StatusTracker>>;

/// Cached status state with change-gated feed emission
pub struct StatusTracker {
    config: Config,
    window: NightWindow,
    sensors: Box<dyn SensorSource>,
    publisher: FeedPublisher,
    snapshot: Option<StatusSnapshot>,
    last_flags: Option<StatusFlags>,
    logger: crate::logging::StructuredLogger,
}

impl StatusTracker {
    /// Create a new tracker; fails if the night window config is malformed
    pub fn new(config: Config, sensors: Box<dyn SensorSource>) -> Result<Self> {
        let window = NightWindow::from_config(&config.night)?;
        let publisher = FeedPublisher::new(&config.feed);

        Ok(Self {
            config,
            window,
            sensors,
            publisher,
            snapshot: None,
            last_flags: None,
            logger: get_logger("tracker"),
        })
    }

    /// Access the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Return the current snapshot, recomputing when stale or forced.
    ///
    /// A cached snapshot is served unchanged while it is within the
    /// freshness window. A failed recomputation propagates the sensor
    /// error; it never extends the freshness of the previous snapshot.
    pub async fn current(&mut self, force_refresh: bool) -> Result<StatusSnapshot> {
        if !force_refresh
            && let Some(snapshot) = &self.snapshot
        {
            let age = Utc::now() - snapshot.observed_at;
            if age <= Duration::seconds(self.config.cache.freshness_seconds as i64) {
                return Ok(snapshot.clone());
            }
        }
        self.refresh().await
    }

    /// Recompute the snapshot and commit it, emitting a feed entry when
    /// the `(occupancy, sleeping)` pair changed since the last commit.
    async fn refresh(&mut self) -> Result<StatusSnapshot> {
        let ha = &self.config.homeassistant;
        let occupancy = self.sensors.entity_state(&ha.occupancy_entity).await?;
        let lazy = self.sensors.entity_state(&ha.lazy_counter_entity).await?;
        let phone = self.sensors.entity_state(&ha.phone_entity).await?;

        let snapshot = derive_snapshot(
            &occupancy.state,
            Some(&lazy.state),
            &phone.state,
            Local::now().time(),
            &self.window,
            Utc::now(),
        );

        let flags = snapshot.flags();
        if self.last_flags != Some(flags) {
            // The writer must see the transition before the new flags
            // commit; a failed write aborts the commit so the next
            // successful refresh re-attempts the entry.
            self.publisher.publish(&snapshot)?;
            self.logger.info(&format!(
                "Status changed: occupancy={:?}, sleeping={}",
                flags.occupancy, flags.sleeping
            ));
        }

        self.last_flags = Some(flags);
        self.snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }
}
