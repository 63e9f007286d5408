//! Date/time utilities for drivesync.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Format of the date bucket folder name.
pub const DATE_BUCKET_FORMAT: &str = "%Y-%m-%d";

/// Compute the date bucket folder name for an instant.
///
/// # Arguments
///
/// * `dt` - The instant, in UTC
/// * `timezone` - Timezone name (e.g., "Asia/Seoul", "UTC")
///
/// # Returns
///
/// The calendar date in `timezone` as `YYYY-MM-DD`. An unknown timezone
/// falls back to UTC.
pub fn date_bucket(dt: &DateTime<Utc>, timezone: &str) -> String {
    match timezone.parse::<Tz>() {
        Ok(tz) => dt.with_timezone(&tz).format(DATE_BUCKET_FORMAT).to_string(),
        Err(_) => dt.format(DATE_BUCKET_FORMAT).to_string(),
    }
}

/// Date bucket for the current instant.
pub fn today_bucket(timezone: &str) -> String {
    date_bucket(&Utc::now(), timezone)
}

/// Parse an RFC3339 timestamp as returned by the Drive API.
pub fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
