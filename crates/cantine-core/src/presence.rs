//! Daily presence of a consumer.
//!
//! There is at most one presence row per (consumer, date). Marking a
//! consumer present upserts that row; marking them absent removes it. Every
//! backend applies the same rule so the two states are "row with
//! `is_present = true`" and "no row".

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, consumer::WithConsumer, time::serde_timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
  pub id:          String,
  pub consumer_id: String,
  pub date:        NaiveDate,
  #[serde(default = "present")]
  pub is_present:  bool,
  #[serde(with = "serde_timestamp")]
  pub created_at:  DateTime<Utc>,
}

pub type PresenceWithConsumer = WithConsumer<Presence>;

/// Input for [`CanteenStore::mark_presence`](crate::store::CanteenStore::mark_presence).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPresence {
  pub consumer_id: String,
  pub date:        NaiveDate,
  #[serde(default = "present")]
  pub is_present:  bool,
}

impl MarkPresence {
  pub fn new(consumer_id: impl Into<String>, date: NaiveDate, is_present: bool) -> Self {
    Self { consumer_id: consumer_id.into(), date, is_present }
  }

  pub fn validate(self) -> Result<Self> {
    if self.consumer_id.trim().is_empty() {
      return Err(Error::Validation("consumerId is required".into()));
    }
    Ok(self)
  }

  /// The row to insert when no presence exists yet for this pair.
  pub fn into_presence(self, id: String, created_at: DateTime<Utc>) -> Presence {
    Presence {
      id,
      consumer_id: self.consumer_id,
      date: self.date,
      is_present: true,
      created_at,
    }
  }
}

fn present() -> bool { true }
