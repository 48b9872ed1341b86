//! # Temporal Types: RFC 3339 Timestamps
//!
//! The JTD `timestamp` type accepts any string that parses as an RFC 3339
//! date-time, with any offset. [`is_timestamp`] is the single acceptance
//! check shared by the validator and the parser, so the two back-ends can
//! never disagree about a value.
//!
//! [`Timestamp`] is the producing side: callers that hold a `chrono`
//! date-time convert it into the string form the serializer emits. Output
//! is always UTC with a `Z` suffix and fixed millisecond precision:
//! `YYYY-MM-DDTHH:MM:SS.mmmZ`.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TimestampError;

/// Length of a bare `YYYY-MM-DD` date.
const DATE_LEN: usize = 10;

/// Returns true if `s` is an RFC 3339 date-time.
///
/// With `allow_date`, a full-date without a time component
/// (`YYYY-MM-DD`) is accepted as well.
pub fn is_timestamp(s: &str, allow_date: bool) -> bool {
    if DateTime::parse_from_rfc3339(s).is_ok() {
        return true;
    }
    allow_date && s.len() == DATE_LEN && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// A UTC timestamp, truncated to millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to milliseconds.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating
    /// sub-millisecond precision.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_millis(dt))
    }

    /// Parse an RFC 3339 string with any offset, converting to UTC.
    ///
    /// # Errors
    ///
    /// Returns `TimestampError` if the string is not RFC 3339.
    pub fn parse(s: &str) -> Result<Self, TimestampError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| TimestampError {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_utc(dt.with_timezone(&Utc)))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    pub fn to_rfc3339(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }

    /// The JSON string value the serializer writes for this timestamp.
    pub fn into_value(self) -> Value {
        Value::String(self.to_rfc3339())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        ts.into_value()
    }
}

fn truncate_to_millis(dt: DateTime<Utc>) -> DateTime<Utc> {
    let millis = dt.nanosecond() / 1_000_000;
    dt.with_nanosecond(millis * 1_000_000).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_utc_timestamp_accepted() {
        assert!(is_timestamp("1985-04-12T23:20:50.52Z", false));
    }

    #[test]
    fn test_offset_timestamp_accepted() {
        assert!(is_timestamp("1996-12-19T16:39:57-08:00", false));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(!is_timestamp("foo", false));
        assert!(!is_timestamp("", false));
        assert!(!is_timestamp("1985-04-12", false));
    }

    #[test]
    fn test_allow_date_accepts_full_date_only() {
        assert!(is_timestamp("1985-04-12", true));
        assert!(!is_timestamp("1985-4-12", true));
        assert!(!is_timestamp("1985-13-12", true));
    }

    #[test]
    fn test_render_has_fixed_millisecond_precision() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(Timestamp::from_utc(dt).to_rfc3339(), "2026-01-15T12:00:00.000Z");
    }

    #[test]
    fn test_from_utc_truncates_below_millis() {
        let dt = Utc
            .with_ymd_and_hms(2026, 1, 15, 12, 30, 45)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();
        assert_eq!(Timestamp::from_utc(dt).to_rfc3339(), "2026-01-15T12:30:45.123Z");
    }

    #[test]
    fn test_parse_converts_offset_to_utc() {
        let ts = Timestamp::parse("2026-01-15T17:00:00+05:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-01-15T12:00:00.000Z");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        let err = Timestamp::parse("yesterday").unwrap_err();
        assert_eq!(err.input, "yesterday");
    }

    #[test]
    fn test_rendered_output_is_a_timestamp() {
        let ts = Timestamp::now();
        assert!(is_timestamp(&ts.to_rfc3339(), false));
        assert_eq!(ts.into_value(), Value::String(ts.to_rfc3339()));
    }
}
