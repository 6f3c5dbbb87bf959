//! # Bedwatch - bed occupancy status with a syndicated change feed
//!
//! A small service that polls a Home Assistant instance for bed-occupancy
//! sensors, derives a cached "in bed / sleeping" status, renders it on a
//! web page, and appends an RSS entry whenever the derived status changes.
//!
//! ## Architecture
//!
//! The application follows a modular architecture with clear separation of
//! concerns:
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `hass`: Home Assistant REST API client
//! - `status`: Night-window classification and status derivation
//! - `duration_fmt`: Human-readable duration formatting
//! - `tracker`: Snapshot caching and change detection
//! - `feed`: Durable RSS feed storage and rendering
//! - `web`: HTTP server for the status page and JSON API

pub mod config;
pub mod duration_fmt;
pub mod error;
pub mod feed;
pub mod hass;
pub mod logging;
pub mod status;
pub mod tracker;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::{BedwatchError, Result};
pub use status::StatusSnapshot;
pub use tracker::StatusTracker;
