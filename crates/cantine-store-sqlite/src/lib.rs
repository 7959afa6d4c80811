//! SQLite backend for the Cantine meal tracker.
//!
//! Serves both as the server's relational store and as the embedded store of
//! an offline device. Wraps [`tokio_rusqlite`] so all database access runs on
//! a dedicated thread without blocking the async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
