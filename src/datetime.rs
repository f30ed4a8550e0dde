//! Date/time utilities for gator.
//!
//! Timestamps are stored as fixed-width RFC3339 strings in UTC with
//! microsecond precision, so lexicographic order in SQL matches
//! chronological order. That property is what lets the fetch ledger
//! compare and order `last_fetched_at` values inside queries.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use chrono_tz::Tz;

/// Encode a timestamp for storage.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a stored timestamp.
///
/// Accepts RFC3339 and the SQLite `datetime('now')` layout.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

/// Parse an item publication date.
///
/// Syndication documents carry RFC 2822 dates
/// (`Mon, 02 Jan 2006 15:04:05 -0700`); nothing else is accepted.
pub fn parse_pub_date(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc2822(s.trim()).map(|dt| dt.with_timezone(&Utc))
}

/// Format a DateTime<Utc> in the specified timezone.
///
/// Falls back to UTC when the timezone name is unknown.
pub fn format_utc_datetime(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let tz: Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => return dt.format(format).to_string(),
    };
    dt.with_timezone(&tz).format(format).to_string()
}
