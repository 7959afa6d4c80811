//! Handlers for `/consumers` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/consumers` | Ordered by name |
//! | `POST`   | `/consumers` | Body: `{"name":"…","department":"…"}` |
//! | `GET`    | `/consumers/{id}` | 404 if not found |
//! | `PUT`    | `/consumers/{id}` | Body: `{"name"?, "department"?}` |
//! | `DELETE` | `/consumers/{id}` | Cascades to presences and consumptions |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use cantine_core::{
  consumer::{Consumer, ConsumerPatch, NewConsumer},
  store::CanteenStore,
};

use crate::{error::ApiError, extract::JsonBody};

/// `GET /consumers`
pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<Vec<Consumer>>, ApiError>
where
  S: CanteenStore,
{
  let consumers = store.list_consumers().await.map_err(ApiError::store)?;
  Ok(Json(consumers))
}

/// `POST /consumers`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  JsonBody(body): JsonBody<NewConsumer>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CanteenStore,
{
  let consumer = store.create_consumer(body).await.map_err(ApiError::store)?;
  tracing::info!(id = %consumer.id, name = %consumer.name, "consumer created");
  Ok((StatusCode::CREATED, Json(consumer)))
}

/// `GET /consumers/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<Consumer>, ApiError>
where
  S: CanteenStore,
{
  let consumer = store
    .get_consumer(&id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("consumer not found: {id}")))?;
  Ok(Json(consumer))
}

/// `PUT /consumers/{id}`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
  JsonBody(patch): JsonBody<ConsumerPatch>,
) -> Result<Json<Consumer>, ApiError>
where
  S: CanteenStore,
{
  let consumer = store.update_consumer(&id, patch).await.map_err(ApiError::store)?;
  Ok(Json(consumer))
}

/// `DELETE /consumers/{id}`
pub async fn delete<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: CanteenStore,
{
  store.delete_consumer(&id).await.map_err(ApiError::store)?;
  tracing::info!(%id, "consumer deleted");
  Ok(StatusCode::NO_CONTENT)
}
