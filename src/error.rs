//! Error types and handling for Bedwatch
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Bedwatch operations
pub type Result<T> = std::result::Result<T, BedwatchError>;

/// Main error type for Bedwatch
#[derive(Debug, Error)]
pub enum BedwatchError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Sensor platform errors (entity read failed or came back unusable)
    #[error("Sensor error: {entity} - {message}")]
    Sensor { entity: String, message: String },

    /// Feed persistence errors (durable store or rendered document)
    #[error("Feed error: {message}")]
    Feed { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },
}

impl BedwatchError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        BedwatchError::Config {
            message: message.into(),
        }
    }

    /// Create a new sensor error for a specific entity
    pub fn sensor<S: Into<String>>(entity: S, message: S) -> Self {
        BedwatchError::Sensor {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Create a new feed persistence error
    pub fn feed<S: Into<String>>(message: S) -> Self {
        BedwatchError::Feed {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        BedwatchError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        BedwatchError::Io {
            message: message.into(),
        }
    }

    /// Whether this error represents a transient sensor read failure
    pub fn is_sensor_unavailable(&self) -> bool {
        matches!(self, BedwatchError::Sensor { .. })
    }
}

impl From<std::io::Error> for BedwatchError {
    fn from(err: std::io::Error) -> Self {
        BedwatchError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for BedwatchError {
    fn from(err: serde_yaml::Error) -> Self {
        BedwatchError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BedwatchError {
    fn from(err: serde_json::Error) -> Self {
        BedwatchError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for BedwatchError {
    fn from(err: reqwest::Error) -> Self {
        BedwatchError::Network {
            message: err.to_string(),
        }
    }
}

impl From<chrono::ParseError> for BedwatchError {
    fn from(err: chrono::ParseError) -> Self {
        BedwatchError::validation("datetime", &err.to_string())
    }
}
