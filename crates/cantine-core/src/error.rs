//! Error taxonomy shared by every Cantine backend.
//!
//! Backends keep their own error enums and convert into this one, so callers
//! of the data-access facade can branch on the kind of failure without
//! knowing which backend served the call.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: String },

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("invalid input: {0}")]
  Validation(String),

  #[error("service unreachable: {0}")]
  Connectivity(String),

  #[error("store initialization failed: {0}")]
  Initialization(String),

  /// A non-success response that maps onto none of the kinds above.
  #[error("remote service answered {status}: {message}")]
  Remote { status: u16, message: String },

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
    Self::NotFound { entity, id: id.into() }
  }

  pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Storage(Box::new(e))
  }

  pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound { .. }) }

  pub fn is_validation(&self) -> bool { matches!(self, Self::Validation(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
