//! Meal consumptions — fixed-price events, created or deleted but never
//! edited.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, consumer::WithConsumer, time::serde_timestamp};

/// The two meal prices the canteen charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MealPrice {
  Standard,
  Full,
}

impl MealPrice {
  pub const ALL: [MealPrice; 2] = [MealPrice::Standard, MealPrice::Full];

  pub fn amount(self) -> u32 {
    match self {
      MealPrice::Standard => 700,
      MealPrice::Full => 1000,
    }
  }
}

impl TryFrom<u32> for MealPrice {
  type Error = Error;

  fn try_from(amount: u32) -> Result<Self> {
    MealPrice::ALL
      .into_iter()
      .find(|p| p.amount() == amount)
      .ok_or_else(|| Error::Validation(format!("amount must be 700 or 1000, got {amount}")))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumption {
  pub id:          String,
  pub consumer_id: String,
  pub amount:      u32,
  pub date:        NaiveDate,
  #[serde(with = "serde_timestamp")]
  pub created_at:  DateTime<Utc>,
}

pub type ConsumptionWithConsumer = WithConsumer<Consumption>;

/// Input for creating a consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConsumption {
  pub consumer_id: String,
  pub amount:      u32,
  pub date:        NaiveDate,
}

impl NewConsumption {
  pub fn new(consumer_id: impl Into<String>, amount: u32, date: NaiveDate) -> Self {
    Self { consumer_id: consumer_id.into(), amount, date }
  }

  pub fn validate(self) -> Result<Self> {
    if self.consumer_id.trim().is_empty() {
      return Err(Error::Validation("consumerId is required".into()));
    }
    MealPrice::try_from(self.amount)?;
    Ok(self)
  }

  pub fn into_consumption(self, id: String, created_at: DateTime<Utc>) -> Consumption {
    Consumption {
      id,
      consumer_id: self.consumer_id,
      amount: self.amount,
      date: self.date,
      created_at,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn day() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 1, 15).unwrap() }

  #[test]
  fn only_the_two_tiers_are_accepted() {
    assert_eq!(MealPrice::try_from(700).unwrap(), MealPrice::Standard);
    assert_eq!(MealPrice::try_from(1000).unwrap(), MealPrice::Full);
    assert!(MealPrice::try_from(650).unwrap_err().is_validation());
    assert!(NewConsumption::new("c-1", 0, day()).validate().unwrap_err().is_validation());
  }

  #[test]
  fn missing_consumer_is_rejected() {
    assert!(NewConsumption::new("  ", 700, day()).validate().unwrap_err().is_validation());
  }

  #[test]
  fn joined_consumption_serialises_flat() {
    let joined = ConsumptionWithConsumer {
      record:   NewConsumption::new("c-1", 700, day())
        .into_consumption("m-1".into(), DateTime::from_timestamp(1_705_305_600, 0).unwrap()),
      consumer: None,
    };
    let json = serde_json::to_value(&joined).unwrap();
    assert_eq!(json["consumerId"], "c-1");
    assert_eq!(json["date"], "2024-01-15");
    assert!(json["consumer"].is_null());

    let back: ConsumptionWithConsumer = serde_json::from_value(json).unwrap();
    assert_eq!(back, joined);
  }
}
