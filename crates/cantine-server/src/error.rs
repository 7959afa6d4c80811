//! Error types and axum `IntoResponse` implementation for the session layer.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("not authenticated")]
  Unauthorized,
  #[error("invalid credentials")]
  InvalidCredentials,
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
