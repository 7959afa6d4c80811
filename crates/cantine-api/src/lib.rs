//! JSON REST API for Cantine.
//!
//! Exposes an axum [`Router`] backed by any [`cantine_core::store::CanteenStore`].
//! Sessions, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", cantine_api::api_router(store.clone()))
//! ```

pub mod consumers;
pub mod consumptions;
pub mod error;
pub mod extract;
pub mod presences;
pub mod report;
pub mod statistics;

use std::sync::Arc;

use axum::{Router, routing::get};
use cantine_core::store::CanteenStore;
use chrono::NaiveDate;
use serde::Deserialize;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: CanteenStore + 'static,
{
  Router::new()
    // Consumers
    .route("/consumers", get(consumers::list::<S>).post(consumers::create::<S>))
    .route(
      "/consumers/{id}",
      get(consumers::get_one::<S>)
        .put(consumers::update::<S>)
        .delete(consumers::delete::<S>),
    )
    // Presences
    .route("/presences", axum::routing::post(presences::mark::<S>))
    .route("/presences/{date}", get(presences::for_date::<S>))
    // Consumptions
    .route(
      "/consumptions",
      get(consumptions::list::<S>).post(consumptions::create::<S>),
    )
    .route("/consumptions/{id}", axum::routing::delete(consumptions::delete::<S>))
    // Statistics & report
    .route("/statistics", get(statistics::daily::<S>))
    .route("/report", get(report::daily::<S>))
    .with_state(store)
}

/// `?date=YYYY-MM-DD`, shared by the date-scoped read endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct DateParams {
  pub date: Option<String>,
}

impl DateParams {
  /// The requested date, or today (UTC) when none was given.
  pub fn resolve(&self) -> Result<NaiveDate, ApiError> {
    match self.date.as_deref().filter(|d| !d.trim().is_empty()) {
      Some(raw) => Ok(cantine_core::time::parse_date(raw)?),
      None => Ok(cantine_core::time::today()),
    }
  }
}

#[cfg(test)]
mod tests;
