//! Status classification and derivation
//!
//! Converts raw sensor readings into a `StatusSnapshot`. Derivation is a
//! pure function of the readings and the clock; all IO stays in the
//! tracker so classification can be tested in isolation.

use crate::config::NightConfig;
use crate::duration_fmt::parse_hours;
use crate::error::{BedwatchError, Result};
use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};

/// Tri-state bed occupancy derived from the binary sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    /// Sensor reported "on"
    InBed,

    /// Sensor reported "off"
    OutOfBed,

    /// Sensor reported anything else (unavailable, unknown, ...)
    Unknown,
}

impl Occupancy {
    /// Map the raw binary sensor value
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "on" => Occupancy::InBed,
            "off" => Occupancy::OutOfBed,
            _ => Occupancy::Unknown,
        }
    }

    /// Strictly occupied; `Unknown` is not enough
    pub fn is_in_bed(self) -> bool {
        matches!(self, Occupancy::InBed)
    }
}

/// The `(occupancy, sleeping)` pair used for change detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlags {
    pub occupancy: Occupancy,
    pub sleeping: bool,
}

/// One derived status observation, immutable once built
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    /// Bed occupancy state
    pub occupancy: Occupancy,

    /// Elapsed time in bed from the lazy counter
    pub time_in_bed: Duration,

    /// Occupied at night with the phone idle
    pub sleeping: bool,

    /// When this snapshot was derived
    pub observed_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// The flag pair compared between consecutive derivations
    pub fn flags(&self) -> StatusFlags {
        StatusFlags {
            occupancy: self.occupancy,
            sleeping: self.sleeping,
        }
    }
}

/// Configured nightly window, possibly spanning midnight
#[derive(Debug, Clone, Copy)]
pub struct NightWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl NightWindow {
    /// Build a window from HH:MM config strings
    pub fn from_config(config: &NightConfig) -> Result<Self> {
        let start = parse_hhmm("night.start", &config.start)?;
        let end = parse_hhmm("night.end", &config.end)?;
        Ok(Self { start, end })
    }

    /// Whether `now` falls inside the window, boundaries inclusive
    pub fn contains(&self, now: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= now && now <= self.end
        } else {
            // Window spans midnight
            now >= self.start || now <= self.end
        }
    }
}

fn parse_hhmm(field: &'static str, raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| BedwatchError::validation(field, "expected HH:MM"))
}

/// Derive a snapshot from raw readings.
///
/// `sleeping` requires the phone to be idle, the local time to fall in the
/// night window, and occupancy to be strictly `InBed`; an unknown
/// occupancy never yields sleeping.
pub fn derive_snapshot(
    occupancy_raw: &str,
    lazy_hours_raw: Option<&str>,
    phone_raw: &str,
    local_time: NaiveTime,
    window: &NightWindow,
    observed_at: DateTime<Utc>,
) -> StatusSnapshot {
    let occupancy = Occupancy::from_raw(occupancy_raw);
    let time_in_bed = parse_hours(lazy_hours_raw);
    let sleeping = phone_raw == "off" && window.contains(local_time) && occupancy.is_in_bed();

    StatusSnapshot {
        occupancy,
        time_in_bed,
        sleeping,
        observed_at,
    }
}

/// Three-way status label for titles and descriptions
pub fn status_label(snapshot: &StatusSnapshot) -> &'static str {
    if snapshot.sleeping {
        "sleeping"
    } else if snapshot.occupancy.is_in_bed() {
        "in bed"
    } else {
        "not in bed"
    }
}

/// Round a timestamp to the nearest whole minute for display
pub fn round_to_minute(dt: DateTime<Utc>) -> DateTime<Utc> {
    let truncated = dt
        .with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt);
    if dt.second() >= 30 {
        truncated + Duration::minutes(1)
    } else {
        truncated
    }
}
