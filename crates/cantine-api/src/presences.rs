//! Handlers for `/presences` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/presences` | Body: `{"consumerId","date"?,"isPresent"}`; 201 with the row, 204 when cleared |
//! | `GET`  | `/presences/{date}` | Every consumer with their flag for `date` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use cantine_core::{
  consumer::ConsumerWithPresence,
  presence::MarkPresence,
  store::CanteenStore,
  time::{parse_date, today},
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{error::ApiError, extract::JsonBody};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkBody {
  pub consumer_id: String,
  #[serde(default)]
  pub date:        Option<NaiveDate>,
  #[serde(default = "present")]
  pub is_present:  bool,
}

fn present() -> bool { true }

/// `POST /presences`
pub async fn mark<S>(
  State(store): State<Arc<S>>,
  JsonBody(body): JsonBody<MarkBody>,
) -> Result<Response, ApiError>
where
  S: CanteenStore,
{
  let date = body.date.unwrap_or_else(today);
  let input = MarkPresence::new(body.consumer_id, date, body.is_present);
  let marked = store.mark_presence(input).await.map_err(ApiError::store)?;
  Ok(match marked {
    Some(presence) => (StatusCode::CREATED, Json(presence)).into_response(),
    None => StatusCode::NO_CONTENT.into_response(),
  })
}

/// `GET /presences/{date}`
pub async fn for_date<S>(
  State(store): State<Arc<S>>,
  Path(date): Path<String>,
) -> Result<Json<Vec<ConsumerWithPresence>>, ApiError>
where
  S: CanteenStore,
{
  let date = parse_date(&date)?;
  let rows = store.consumers_with_presence(date).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}
