//! Date/time utilities for tagwatch.
//!
//! Timestamps are stored as UTC text in a fixed-width format so that
//! SQLite's string comparison orders them chronologically.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Storage format for timestamps (UTC, millisecond precision).
pub const DB_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Format a UTC timestamp for storage.
pub fn to_db_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(DB_DATETIME_FORMAT).to_string()
}

/// Parse a stored datetime string.
///
/// Accepts the storage format, RFC3339, and the plain SQLite
/// `YYYY-MM-DD HH:MM:SS` format (assumed UTC).
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, DB_DATETIME_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}
