//! `GET /statistics?date=` — the dashboard figures of one day.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use cantine_core::{stats::DailyStats, store::CanteenStore};

use crate::{DateParams, error::ApiError};

pub async fn daily<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<DateParams>,
) -> Result<Json<DailyStats>, ApiError>
where
  S: CanteenStore,
{
  let stats = store.daily_stats(params.resolve()?).await.map_err(ApiError::store)?;
  Ok(Json(stats))
}
