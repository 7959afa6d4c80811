//! Whole-store exports, used to seed an offline device from the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  consumer::Consumer, consumption::Consumption, presence::Presence, time::serde_timestamp,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
  #[serde(default)]
  pub consumers:    Vec<Consumer>,
  #[serde(default)]
  pub presences:    Vec<Presence>,
  #[serde(default)]
  pub consumptions: Vec<Consumption>,
  #[serde(with = "serde_timestamp", default = "Utc::now")]
  pub exported_at:  DateTime<Utc>,
}

/// Outcome of importing a [`Snapshot`]. Records whose id already exists are
/// skipped rather than overwritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
  pub consumers:    usize,
  pub presences:    usize,
  pub consumptions: usize,
  pub skipped:      usize,
}
