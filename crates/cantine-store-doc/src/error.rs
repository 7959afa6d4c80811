//! Error type for `cantine-store-doc`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot open document store at {path}: {reason}")]
  Initialization { path: PathBuf, reason: String },

  #[error("{collection} already holds a record with id {id}")]
  Conflict { collection: &'static str, id: String },

  #[error("{collection} has no index named {index:?}")]
  UnknownIndex { collection: &'static str, index: String },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for cantine_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Initialization { .. } => Self::Initialization(e.to_string()),
      Error::Conflict { .. } => Self::Conflict(e.to_string()),
      Error::Json(e) => Self::Serialization(e),
      other => Self::storage(other),
    }
  }
}
