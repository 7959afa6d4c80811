//! Document-store backend for offline use.
//!
//! Three record collections (`consumers`, `presences`, `consumptions`), each
//! keyed by `id` with non-unique secondary indexes, persisted as one JSON
//! file per collection. This crate only offers record-level primitives;
//! cascades and upsert rules are the caller's business.

mod collection;
mod document;
mod store;

pub mod error;

pub use collection::Document;
pub use error::{Error, Result};
pub use store::DocStore;

#[cfg(test)]
mod tests;
