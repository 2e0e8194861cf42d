use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};

use crate::error::{EtlError, Result};

/// Format a UTC instant for storage: `YYYY-MM-DDTHH:MM:SS.mmmZ`.
///
/// Fixed width, so lexical ordering in SQL matches chronological ordering.
pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    // use_z = true gives "Z" rather than "+00:00"
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format a UTC instant for the API's `date_from` filter.
pub fn format_api_timestamp(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse an RFC 3339 timestamp with any offset into UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    // A timestamp without an offset is rejected rather than guessed
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EtlError::Transform(format!("Invalid timestamp '{}': {}", value, e)))
}

pub fn format_day(day: &NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

pub fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| EtlError::Load(format!("Invalid day '{}' in store: {}", value, e)))
}

/// Half-open storage range `[day 00:00, next day 00:00)` for a UTC calendar day.
pub fn day_bounds(day: &NaiveDate) -> (String, String) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    let end = start + chrono::Duration::days(1);
    (format_timestamp(&start), format_timestamp(&end))
}
