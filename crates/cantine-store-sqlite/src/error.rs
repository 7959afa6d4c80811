//! Error type for `cantine-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] cantine_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("consumer not found: {0}")]
  ConsumerNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  /// Whether SQLite rejected the statement on a constraint (unique key,
  /// foreign key, not null).
  pub fn is_constraint_violation(&self) -> bool {
    matches!(
      self,
      Error::Database(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)))
        if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
  }
}

impl From<Error> for cantine_core::Error {
  fn from(e: Error) -> Self {
    if e.is_constraint_violation() {
      return Self::Conflict(e.to_string());
    }
    match e {
      Error::Core(e) => e,
      Error::ConsumerNotFound(id) => Self::not_found("consumer", id),
      other => Self::storage(other),
    }
  }
}
