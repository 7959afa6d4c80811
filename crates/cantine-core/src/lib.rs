//! Core types and trait definitions for the Cantine meal tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Every backend (document store, SQLite, remote HTTP) implements
//! [`store::CanteenStore`] over the types defined here.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod consumer;
pub mod consumption;
pub mod error;
pub mod presence;
pub mod report;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod time;

pub use error::{Error, Result};

/// Opaque identifier for a newly created record.
pub fn new_id() -> String { uuid::Uuid::new_v4().to_string() }
