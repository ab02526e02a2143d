//! Time utilities: civil timestamps in the terminal's fixed offset.

use crate::errors::{AppError, AppResult};
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};

/// Storage format of `attendance_events.timestamp`; sorts lexicographically.
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and `YYYY-MM-DD HH:MM`.
pub fn parse_timestamp(s: &str) -> AppResult<NaiveDateTime> {
    let s = s.trim();
    for fmt in [TS_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }
    Err(AppError::InvalidTimestamp(s.to_string()))
}

pub fn parse_date(s: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| AppError::InvalidDate(s.into()))
}

/// Parse a UTC offset such as `+09:00` or `-05:30`.
pub fn parse_offset(s: &str) -> AppResult<FixedOffset> {
    s.trim()
        .parse::<FixedOffset>()
        .map_err(|_| AppError::Config(format!("invalid utc_offset '{}'", s)))
}

/// Current civil time in `offset`, truncated to whole seconds.
pub fn now_in(offset: &FixedOffset) -> NaiveDateTime {
    let local = Utc::now().with_timezone(offset).naive_local();
    local.with_nanosecond(0).unwrap_or(local)
}

pub fn today_in(offset: &FixedOffset) -> NaiveDate {
    now_in(offset).date()
}
