//! Human-readable duration formatting
//!
//! Converts elapsed-time measurements into English phrases for the status
//! page and feed entries. Formatting is a soft-failure contract: a bad
//! input yields a typed error the caller renders as a sentinel string,
//! never a panic.

use chrono::Duration;
use thiserror::Error;

/// Sentinel text rendered when a duration cannot be formatted
pub const INVALID_DURATION_TEXT: &str = "Invalid time format";

/// Formatting failure for malformed duration input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// Elapsed time can never be negative
    #[error("negative duration")]
    Negative,
}

/// Format a duration as the most natural English phrase.
///
/// Zero total minutes renders as "0 minutes"; hours and minutes pluralize
/// independently and join with "and" when both are present.
pub fn format_duration(d: Duration) -> std::result::Result<String, FormatError> {
    let total_seconds = d.num_seconds();
    if total_seconds < 0 {
        return Err(FormatError::Negative);
    }

    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;

    let hours_str = match hours {
        0 => String::new(),
        1 => "1 hour".to_string(),
        n => format!("{} hours", n),
    };

    let minutes_str = match minutes {
        0 => String::new(),
        1 => "1 minute".to_string(),
        n => format!("{} minutes", n),
    };

    Ok(match (hours_str.is_empty(), minutes_str.is_empty()) {
        (false, false) => format!("{} and {}", hours_str, minutes_str),
        (false, true) => hours_str,
        (true, false) => minutes_str,
        (true, true) => "0 minutes".to_string(),
    })
}

/// Format a duration, falling back to the sentinel text on failure
pub fn format_duration_or_sentinel(d: Duration) -> String {
    format_duration(d).unwrap_or_else(|_| INVALID_DURATION_TEXT.to_string())
}

/// Parse a decimal hour count (e.g. "2.5") into a duration.
///
/// Unparsable or missing input yields a zero duration; sensor flakiness
/// must degrade gracefully rather than break rendering.
pub fn parse_hours(raw: Option<&str>) -> Duration {
    let Some(raw) = raw else {
        return Duration::zero();
    };
    match raw.trim().parse::<f64>() {
        Ok(hours) if hours.is_finite() => {
            let whole = hours.trunc() as i64;
            let minutes = ((hours - hours.trunc()) * 60.0).round() as i64;
            // A counter reading large enough to overflow the duration range
            // is as degenerate as an unparsable one
            match (Duration::try_hours(whole), Duration::try_minutes(minutes)) {
                (Some(h), Some(m)) => h.checked_add(&m).unwrap_or_else(Duration::zero),
                _ => Duration::zero(),
            }
        }
        _ => Duration::zero(),
    }
}
