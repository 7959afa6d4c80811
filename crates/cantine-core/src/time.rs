//! Timestamp and calendar-date helpers.
//!
//! Timestamps are written as fixed-width RFC 3339 UTC strings so that stored
//! values sort lexicographically. On the way in we also accept the
//! `YYYY-MM-DD HH:MM:SS` layout SQLite's `CURRENT_TIMESTAMP` produces, which
//! shows up in data exported from older devices.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::{Error, Result};

const NAIVE_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Today's calendar date, in UTC.
pub fn today() -> NaiveDate { Utc::now().date_naive() }

pub fn encode_timestamp(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse any accepted timestamp layout into UTC. Naive values are taken to
/// already be UTC.
pub fn coerce_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.with_timezone(&Utc));
  }
  NAIVE_LAYOUTS
    .iter()
    .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
    .map(|naive| naive.and_utc())
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
    .map_err(|_| Error::Validation(format!("expected a YYYY-MM-DD date, got {raw:?}")))
}

/// `#[serde(with = "...")]` adapter pairing [`encode_timestamp`] with
/// [`coerce_timestamp`].
pub mod serde_timestamp {
  use chrono::{DateTime, Utc};
  use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

  pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&super::encode_timestamp(*dt))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    super::coerce_timestamp(&raw)
      .ok_or_else(|| D::Error::custom(format!("unrecognised timestamp: {raw:?}")))
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Datelike, Timelike};

  use super::*;

  #[test]
  fn encoded_timestamps_have_fixed_width() {
    let whole = DateTime::parse_from_rfc3339("2024-01-15T08:00:00Z").unwrap().with_timezone(&Utc);
    let fractional = DateTime::parse_from_rfc3339("2024-01-15T08:00:00.5Z")
      .unwrap()
      .with_timezone(&Utc);
    assert_eq!(encode_timestamp(whole).len(), encode_timestamp(fractional).len());
    assert!(encode_timestamp(whole) < encode_timestamp(fractional));
  }

  #[test]
  fn coerces_sqlite_layout() {
    let dt = coerce_timestamp("2024-01-15 12:30:05").unwrap();
    assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 1, 15));
    assert_eq!((dt.hour(), dt.minute(), dt.second()), (12, 30, 5));
  }

  #[test]
  fn coerces_offset_timestamps_to_utc() {
    let dt = coerce_timestamp("2024-01-15T12:00:00+02:00").unwrap();
    assert_eq!(dt.hour(), 10);
  }

  #[test]
  fn rejects_garbage() {
    assert!(coerce_timestamp("yesterday").is_none());
    assert!(parse_date("15/01/2024").unwrap_err().is_validation());
  }
}
