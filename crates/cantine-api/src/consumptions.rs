//! Handlers for `/consumptions` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/consumptions?date=` | Newest first, each with its consumer |
//! | `POST`   | `/consumptions` | Body: `{"consumerId","amount","date"?}` |
//! | `DELETE` | `/consumptions/{id}` | 204 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use cantine_core::{
  consumption::{ConsumptionWithConsumer, NewConsumption},
  store::CanteenStore,
  time::today,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{DateParams, error::ApiError, extract::JsonBody};

/// `GET /consumptions[?date=YYYY-MM-DD]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<DateParams>,
) -> Result<Json<Vec<ConsumptionWithConsumer>>, ApiError>
where
  S: CanteenStore,
{
  let rows = store
    .consumptions_by_date(params.resolve()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  pub consumer_id: String,
  pub amount:      u32,
  #[serde(default)]
  pub date:        Option<NaiveDate>,
}

/// `POST /consumptions`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CanteenStore,
{
  let input = NewConsumption::new(body.consumer_id, body.amount, body.date.unwrap_or_else(today));
  let consumption = store.create_consumption(input).await.map_err(ApiError::store)?;
  tracing::info!(id = %consumption.id, amount = consumption.amount, "consumption recorded");
  Ok((StatusCode::CREATED, Json(consumption)))
}

/// `DELETE /consumptions/{id}`
pub async fn delete<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: CanteenStore,
{
  store.delete_consumption(&id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
