// ABOUTME: Utilities for working with site-local datetimes.
// ABOUTME: Provides the canonical "YYYY-MM-DD HH:MM:SS" format and monotonic timers.
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::time::{Duration, Instant};

use crate::{Error, Result};

/// Storage and display format for every schedule timestamp
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current wall-clock time in the site's local zone, without offset
///
/// # Examples
///
/// ```
/// use ql_core::local_now;
/// let now = local_now();
/// assert!(now.and_utc().timestamp() > 1_577_836_800);
/// ```
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Format a datetime in the canonical storage format
///
/// # Examples
///
/// ```
/// use ql_core::{format_datetime, parse_datetime};
/// let t = parse_datetime("2025-01-01 09:00:00").unwrap();
/// assert_eq!(format_datetime(t), "2025-01-01 09:00:00");
/// ```
pub fn format_datetime(time: NaiveDateTime) -> String {
    time.format(DATETIME_FORMAT).to_string()
}

/// Parse a timestamp-equivalent string.
///
/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, a bare date
/// (midnight) or RFC3339 (offset dropped, wall-clock kept).
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();

    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, DATETIME_FORMAT) {
        return Ok(parsed);
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Ok(parsed);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.naive_local());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight);
        }
    }

    Err(Error::Validation(format!("Unparseable datetime '{}'", value)))
}

/// Create a monotonic duration measurer
///
/// # Examples
///
/// ```
/// use ql_core::MonotonicTimer;
/// use std::thread;
/// use std::time::Duration;
///
/// let timer = MonotonicTimer::new();
/// thread::sleep(Duration::from_millis(1));
/// assert!(timer.elapsed() >= Duration::from_millis(1));
/// ```
pub struct MonotonicTimer {
    start: Instant,
}

impl MonotonicTimer {
    /// Create a new timer starting now
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time since creation
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed time in whole milliseconds, for log fields
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for MonotonicTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_parse_canonical_format() {
        let parsed = parse_datetime("2025-03-01 00:00:00").unwrap();
        assert_eq!(format_datetime(parsed), "2025-03-01 00:00:00");
    }

    #[test]
    fn test_parse_alternate_formats() {
        assert_eq!(
            parse_datetime("2025-03-01").unwrap(),
            parse_datetime("2025-03-01 00:00:00").unwrap()
        );
        assert_eq!(
            parse_datetime("2025-03-01T12:30:00").unwrap(),
            parse_datetime("2025-03-01 12:30:00").unwrap()
        );
        assert_eq!(
            parse_datetime("2025-03-01T12:30:00+02:00").unwrap(),
            parse_datetime("2025-03-01 12:30:00").unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_datetime("next tuesday"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_monotonic_timer() {
        let timer = MonotonicTimer::new();
        thread::sleep(Duration::from_millis(1));
        assert!(timer.elapsed() < Duration::from_secs(1));
        assert!(timer.elapsed_ms() < 1000);
    }
}
