//! [`Document`] impls for the three entity types.

use cantine_core::{consumer::Consumer, consumption::Consumption, presence::Presence};

use crate::collection::Document;

pub(crate) const CONSUMER_ID: &str = "consumerId";
pub(crate) const DATE: &str = "date";
pub(crate) const NAME: &str = "name";
pub(crate) const DEPARTMENT: &str = "department";

impl Document for Consumer {
  const COLLECTION: &'static str = "consumers";
  const INDEXES: &'static [&'static str] = &[NAME, DEPARTMENT];

  fn key(&self) -> &str { &self.id }

  fn index_value(&self, index: &str) -> Option<String> {
    match index {
      NAME => Some(self.name.clone()),
      DEPARTMENT => self.department.clone(),
      _ => None,
    }
  }
}

impl Document for Presence {
  const COLLECTION: &'static str = "presences";
  const INDEXES: &'static [&'static str] = &[CONSUMER_ID, DATE];

  fn key(&self) -> &str { &self.id }

  fn index_value(&self, index: &str) -> Option<String> {
    match index {
      CONSUMER_ID => Some(self.consumer_id.clone()),
      DATE => Some(self.date.to_string()),
      _ => None,
    }
  }
}

impl Document for Consumption {
  const COLLECTION: &'static str = "consumptions";
  const INDEXES: &'static [&'static str] = &[CONSUMER_ID, DATE];

  fn key(&self) -> &str { &self.id }

  fn index_value(&self, index: &str) -> Option<String> {
    match index {
      CONSUMER_ID => Some(self.consumer_id.clone()),
      DATE => Some(self.date.to_string()),
      _ => None,
    }
  }
}
