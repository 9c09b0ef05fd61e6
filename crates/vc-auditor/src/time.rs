//! Time utilities for credential date handling.
//!
//! Credential dates use the fixed UTC format `yyyy-MM-dd'T'HH:mm:ss'Z'`
//! (no fractional seconds, no offsets). "Now" is injected through
//! [`Clock`] so date policies can be tested at exact boundaries.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// chrono format string for credential dates.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Parse a credential date. Returns `None` for anything not in [`DATE_FORMAT`].
pub fn parse_date(date: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(date.trim(), DATE_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Format a timestamp as a credential date, truncating sub-second precision.
pub fn format_date(dt: &DateTime<Utc>) -> String {
    dt.format(DATE_FORMAT).to_string()
}

/// Convert a JWT NumericDate (seconds since epoch) to a credential date.
pub fn unix_seconds_to_date(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(|dt| format_date(&dt))
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Freeze at a credential-format date string.
    pub fn at(date: &str) -> Option<Self> {
        parse_date(date).map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
