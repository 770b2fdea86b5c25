//! Utility functions shared by the helpdesk crates

use crate::constants::{DATETIME_FORMATS, DATE_FORMAT};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

/// Error returned when a backend timestamp cannot be parsed
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("Empty timestamp")]
    Empty,

    #[error("Failed to parse timestamp '{0}'")]
    Unrecognized(String),
}

/// Parse an ISO-8601 timestamp as sent by the backend
///
/// RFC 3339 values keep their offset and are converted to UTC. Naive values
/// in one of [`DATETIME_FORMATS`] are taken to be UTC already, and a plain
/// date is midnight UTC of that day.
///
/// # Errors
/// Returns [`TimestampError`] if the string is blank or matches no format
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TimestampError::Empty);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimestampError::Unrecognized(raw.to_string()))
}

/// Format a datetime for display
#[must_use]
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Join first and last name, trimmed, or fall back to `placeholder`
#[must_use]
pub fn compose_display_name(first: Option<&str>, last: Option<&str>, placeholder: &str) -> String {
    let joined = format!("{} {}", first.unwrap_or_default(), last.unwrap_or_default());
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        placeholder.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Truncate a string to at most `max_len` characters, ending in `...`
#[must_use]
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Round half-up to one decimal place; non-finite input becomes 0
#[must_use]
pub fn round_one_decimal(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let rounded = (value * 10.0 + 0.5).floor() / 10.0;
    // Avoid -0.0 leaking into serialized output
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Share of `part` in `whole` as a percentage rounded to one decimal
///
/// Returns 0 when `whole` is 0.
#[must_use]
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    round_one_decimal(part as f64 * 100.0 / whole as f64)
}

/// Signed duration from `start` to `end` in fractional hours
#[must_use]
pub fn hours_between(start: &DateTime<Utc>, end: &DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let millis = (*end - *start).num_milliseconds() as f64;
    millis / 3_600_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let dt = parse_timestamp("2024-03-10T12:30:00Z").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_parse_timestamp_with_offset() {
        let dt = parse_timestamp("2024-03-10T12:30:00-05:00").unwrap();
        assert_eq!(dt.hour(), 17);
    }

    #[test]
    fn test_parse_timestamp_naive_formats() {
        let a = parse_timestamp("2024-03-10T12:30:00").unwrap();
        let b = parse_timestamp("2024-03-10 12:30:00").unwrap();
        let c = parse_timestamp("2024-03-10T12:30:00.123456").unwrap();
        assert_eq!(a, b);
        assert_eq!(c.minute(), 30);

        let d = parse_timestamp("2024-03-10").unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap());
        assert!(parse_timestamp("2024-13-10").is_err());
    }

    #[test]
    fn test_parse_timestamp_errors() {
        assert_eq!(parse_timestamp("   "), Err(TimestampError::Empty));
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(TimestampError::Unrecognized(_))
        ));
    }

    #[test]
    fn test_format_datetime_specific() {
        let dt = parse_timestamp("2023-12-25T15:30:45Z").unwrap();
        assert_eq!(format_datetime(&dt), "2023-12-25 15:30:45 UTC");
    }

    #[test]
    fn test_compose_display_name() {
        assert_eq!(
            compose_display_name(Some("Ana"), Some("Ruiz"), "?"),
            "Ana Ruiz"
        );
        assert_eq!(compose_display_name(Some("Ana"), None, "?"), "Ana");
        assert_eq!(compose_display_name(None, Some(" Ruiz "), "?"), "Ruiz");
        assert_eq!(compose_display_name(Some(""), Some("  "), "?"), "?");
        assert_eq!(compose_display_name(None, None, "nobody"), "nobody");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello world", 5), "he...");
        assert_eq!(truncate_string("hi", 10), "hi");
        assert_eq!(truncate_string("test", 2), "...");
    }

    #[test]
    fn test_truncate_string_multibyte() {
        let s = "áéíóúáéíóú";
        let t = truncate_string(s, 6);
        assert_eq!(t, "áéí...");
    }

    #[test]
    fn test_round_one_decimal() {
        assert_eq!(round_one_decimal(33.333), 33.3);
        assert_eq!(round_one_decimal(66.666), 66.7);
        assert_eq!(round_one_decimal(12.25), 12.3);
        assert_eq!(round_one_decimal(-0.04), 0.0);
        assert_eq!(round_one_decimal(f64::NAN), 0.0);
        assert_eq!(round_one_decimal(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(5, 5), 100.0);
    }

    #[test]
    fn test_hours_between() {
        let a = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
        let b = parse_timestamp("2024-01-01T01:30:00Z").unwrap();
        assert!((hours_between(&a, &b) - 1.5).abs() < f64::EPSILON);
        assert!(hours_between(&b, &a) < 0.0);
    }
}
