//! Scheduled date parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

/// Date-time layouts accepted after separator normalization, most specific first.
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Date-only layout.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Error returned when a form date cannot be turned into a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid date: {input:?}")]
pub struct DateParseError {
    /// The rejected input, as submitted.
    pub input: String,
}

impl DateParseError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}

/// Parses a form date into a UTC timestamp.
///
/// A single space between the date and time parts is treated as the `T`
/// separator. Inputs with an explicit offset are converted to UTC; inputs
/// without one are taken as UTC, and date-only inputs resolve to midnight.
pub fn normalize_date(input: &str) -> Result<DateTime<Utc>, DateParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DateParseError::new(input));
    }

    let normalized = normalize_separator(trimmed);

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Ok(parsed.and_utc());
        }
    }

    NaiveDate::parse_from_str(&normalized, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| DateParseError::new(input))
}

/// Replaces a `YYYY-MM-DD HH:MM` style space with `T`.
fn normalize_separator(input: &str) -> String {
    match input.split_once(' ') {
        Some((date, time)) if date.len() == 10 && !time.contains(' ') => {
            format!("{}T{}", date, time)
        }
        _ => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_date_only_is_midnight_utc() {
        let parsed = normalize_date("2024-01-01").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_datetime_local_input() {
        let parsed = normalize_date("2024-03-15T14:30").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap());
    }

    #[test]
    fn test_space_separator_is_normalized() {
        let with_space = normalize_date("2024-03-15 14:30:45").unwrap();
        let with_t = normalize_date("2024-03-15T14:30:45").unwrap();
        assert_eq!(with_space, with_t);
    }

    #[test]
    fn test_offset_is_converted_to_utc() {
        let parsed = normalize_date("2024-03-15T10:00:00-03:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 15, 13, 0, 0).unwrap());
    }

    #[test]
    fn test_fractional_seconds() {
        let parsed = normalize_date("2024-03-15T10:00:00.250").unwrap();
        assert_eq!(parsed.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert!(normalize_date("  2024-01-01  ").is_ok());
    }

    #[test]
    fn test_rejects_garbage() {
        let err = normalize_date("amanhã").unwrap_err();
        assert_eq!(err.input, "amanhã");

        assert!(normalize_date("").is_err());
        assert!(normalize_date("2024-13-01").is_err());
        assert!(normalize_date("01/02/2024").is_err());
    }
}
