//! Daily statistics.

use serde::{Deserialize, Serialize};

use crate::consumption::{Consumption, MealPrice};

/// Revenue and per-tier counts of one day's consumptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionStats {
  pub total:     u64,
  pub count700:  usize,
  pub count1000: usize,
}

impl ConsumptionStats {
  pub fn tally<'a>(consumptions: impl IntoIterator<Item = &'a Consumption>) -> Self {
    consumptions.into_iter().fold(Self::default(), |mut stats, c| {
      stats.total += u64::from(c.amount);
      match MealPrice::try_from(c.amount) {
        Ok(MealPrice::Standard) => stats.count700 += 1,
        Ok(MealPrice::Full) => stats.count1000 += 1,
        // Legacy rows with other amounts still count towards revenue.
        Err(_) => {}
      }
      stats
    })
  }
}

/// Dashboard figures for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
  pub total_consumers:    usize,
  /// Consumers with a presence row for the day.
  pub present_today:      usize,
  pub daily_consumptions: usize,
  pub daily_revenue:      u64,
}
