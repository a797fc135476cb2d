// Timestamp parsing for the date x-axis convention and the horizon bridge.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Parse a date/time string into epoch milliseconds.
///
/// Accepts RFC 3339, ISO date-times without an offset (treated as UTC), and
/// bare dates. Returns None for anything else; callers decide whether that
/// is a warning (axis values) or fatal (horizon start).
pub fn parse_instant_ms(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc().timestamp_millis());
    }
    None
}
