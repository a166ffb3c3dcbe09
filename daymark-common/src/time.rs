//! Calendar-day helpers
//!
//! All day windows are computed in the reference time zone (UTC). Search providers normalise
//! publication timestamps to midnight, so a window also carries the following day's midnight,
//! which must be excluded from same-day results.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};

use crate::{Error, Result};

/// Reference time zone for day windows
pub const REFERENCE_TZ: Utc = Utc;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse an ISO calendar date (`YYYY-MM-DD`)
pub fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| Error::InvalidInput(format!("Invalid ISO date '{}': {}", value, e)))
}

/// Inclusive publication window for one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    /// 00:00:00.000 of the target day
    pub start: DateTime<Utc>,
    /// 23:59:59.999 of the target day
    pub end: DateTime<Utc>,
    /// 00:00:00.000 of the following day (boundary artifact to exclude)
    pub next_midnight: DateTime<Utc>,
}

impl DayWindow {
    /// Build the window for `date` in the reference time zone
    pub fn for_date(date: NaiveDate) -> Self {
        let start = REFERENCE_TZ.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        let next_midnight = start + Duration::days(1);
        let end = next_midnight - Duration::milliseconds(1);
        Self {
            start,
            end,
            next_midnight,
        }
    }

    /// True if `timestamp` falls inside the window
    ///
    /// The following day's midnight is never inside, even though a provider may report it for
    /// same-day content.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// Format a timestamp the way search providers expect (`2024-04-20T00:00:00.000Z`)
pub fn format_millis(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a provider timestamp leniently
///
/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (taken as midnight).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|d| REFERENCE_TZ.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
}
