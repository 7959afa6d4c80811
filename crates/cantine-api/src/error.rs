//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  BadRequest(String),

  /// The body was missing, not JSON, or did not fit the expected shape.
  #[error(transparent)]
  Body(#[from] JsonRejection),

  #[error("store error: {0}")]
  Store(#[source] cantine_core::Error),
}

impl ApiError {
  /// Convert any backend error through the shared taxonomy.
  pub fn store<E: Into<cantine_core::Error>>(e: E) -> Self { Self::from(e.into()) }
}

impl From<cantine_core::Error> for ApiError {
  fn from(e: cantine_core::Error) -> Self {
    use cantine_core::Error as E;
    match e {
      E::NotFound { .. } => Self::NotFound(e.to_string()),
      E::Conflict(_) => Self::Conflict(e.to_string()),
      E::Validation(_) => Self::BadRequest(e.to_string()),
      other => Self::Store(other),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Body(rejection) => (rejection.status(), rejection.body_text()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
