//! Encoding and decoding helpers between Cantine types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD`, timestamps as fixed-width RFC 3339 UTC
//! strings so that `ORDER BY created_at` sorts chronologically. Rows written
//! by older devices with SQLite's `CURRENT_TIMESTAMP` layout still decode.

use cantine_core::{
  consumer::{Consumer, ConsumerWithPresence, WithConsumer},
  consumption::{Consumption, ConsumptionWithConsumer},
  presence::Presence,
  time::{coerce_timestamp, encode_timestamp},
};
use chrono::{DateTime, NaiveDate, Utc};

use crate::{Error, Result};

// ─── Dates & timestamps ──────────────────────────────────────────────────────

pub fn encode_date(date: NaiveDate) -> String { date.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { encode_timestamp(dt) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  coerce_timestamp(s).ok_or_else(|| Error::DateParse(format!("unrecognised timestamp {s:?}")))
}

// ─── Column lists ────────────────────────────────────────────────────────────

pub const CONSUMER_COLUMNS: &str = "c.id, c.name, c.department, c.created_at";
pub const PRESENCE_COLUMNS: &str = "p.id, p.consumer_id, p.date, p.is_present, p.created_at";
pub const CONSUMPTION_COLUMNS: &str = "m.id, m.consumer_id, m.amount, m.date, m.created_at";

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `consumers` row.
pub struct RawConsumer {
  pub id:         String,
  pub name:       String,
  pub department: Option<String>,
  pub created_at: String,
}

impl RawConsumer {
  /// Read the four consumer columns starting at `offset`.
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(offset)?,
      name:       row.get(offset + 1)?,
      department: row.get(offset + 2)?,
      created_at: row.get(offset + 3)?,
    })
  }

  /// Like [`RawConsumer::from_row`], but `None` when a LEFT JOIN found no
  /// consumer.
  pub fn from_joined_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Option<Self>> {
    match row.get::<_, Option<String>>(offset)? {
      Some(_) => Self::from_row(row, offset).map(Some),
      None => Ok(None),
    }
  }

  pub fn into_consumer(self) -> Result<Consumer> {
    Ok(Consumer {
      id:         self.id,
      name:       self.name,
      department: self.department,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// A consumer row joined with the presence flag of one date.
pub struct RawConsumerWithPresence {
  pub consumer:   RawConsumer,
  pub is_present: bool,
}

impl RawConsumerWithPresence {
  pub fn into_view(self) -> Result<ConsumerWithPresence> {
    Ok(ConsumerWithPresence {
      consumer:   self.consumer.into_consumer()?,
      is_present: self.is_present,
    })
  }
}

/// Raw values read from a `presences` row.
pub struct RawPresence {
  pub id:          String,
  pub consumer_id: String,
  pub date:        String,
  pub is_present:  bool,
  pub created_at:  String,
}

impl RawPresence {
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(offset)?,
      consumer_id: row.get(offset + 1)?,
      date:        row.get(offset + 2)?,
      is_present:  row.get(offset + 3)?,
      created_at:  row.get(offset + 4)?,
    })
  }

  pub fn into_presence(self) -> Result<Presence> {
    Ok(Presence {
      id:          self.id,
      consumer_id: self.consumer_id,
      date:        decode_date(&self.date)?,
      is_present:  self.is_present,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read from a `consumptions` row.
pub struct RawConsumption {
  pub id:          String,
  pub consumer_id: String,
  pub amount:      u32,
  pub date:        String,
  pub created_at:  String,
}

impl RawConsumption {
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(offset)?,
      consumer_id: row.get(offset + 1)?,
      amount:      row.get(offset + 2)?,
      date:        row.get(offset + 3)?,
      created_at:  row.get(offset + 4)?,
    })
  }

  pub fn into_consumption(self) -> Result<Consumption> {
    Ok(Consumption {
      id:          self.id,
      consumer_id: self.consumer_id,
      amount:      self.amount,
      date:        decode_date(&self.date)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// A consumption row LEFT JOINed with its consumer.
pub struct RawConsumptionWithConsumer {
  pub consumption: RawConsumption,
  pub consumer:    Option<RawConsumer>,
}

impl RawConsumptionWithConsumer {
  pub fn into_joined(self) -> Result<ConsumptionWithConsumer> {
    Ok(WithConsumer {
      record:   self.consumption.into_consumption()?,
      consumer: self.consumer.map(RawConsumer::into_consumer).transpose()?,
    })
  }
}
