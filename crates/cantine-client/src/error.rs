//! Error type for the remote adapter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The request never produced a response.
  #[error("request to {url} failed: {source}")]
  Transport {
    url:    String,
    #[source]
    source: reqwest::Error,
  },

  /// The server answered with a non-success status.
  #[error("{method} {path} → {status}: {message}")]
  Status {
    method:  &'static str,
    path:    String,
    status:  u16,
    message: String,
  },

  #[error("malformed response from {path}: {source}")]
  Decode {
    path:   String,
    #[source]
    source: reqwest::Error,
  },

  #[error(transparent)]
  Core(#[from] cantine_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for cantine_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Transport { .. } => Self::Connectivity(e.to_string()),
      Error::Status { status: 404, message, .. } => not_found(&message),
      Error::Status { status: 409, message, .. } => {
        Self::Conflict(strip(&message, "conflict: "))
      }
      Error::Status { status: 400 | 422, message, .. } => {
        Self::Validation(strip(&message, "invalid input: "))
      }
      Error::Status { status, message, .. } => Self::Remote { status, message },
      Error::Decode { .. } => Self::storage(e),
      Error::Core(e) => e,
    }
  }
}

/// Recover the entity from the server's "`<entity>` not found: `<id>`" text.
fn not_found(message: &str) -> cantine_core::Error {
  match message.split_once(" not found: ") {
    Some(("consumer", id)) => cantine_core::Error::not_found("consumer", id),
    Some(("consumption", id)) => cantine_core::Error::not_found("consumption", id),
    _ => cantine_core::Error::not_found("record", message),
  }
}

fn strip(message: &str, prefix: &str) -> String {
  message.strip_prefix(prefix).unwrap_or(message).to_owned()
}
