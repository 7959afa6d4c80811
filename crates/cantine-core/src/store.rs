//! The `CanteenStore` trait — the contract every backend fulfils.
//!
//! Implemented by the SQLite store, the document-store composition used in
//! local mode, and the HTTP client for the remote service. The data-access
//! facade depends on this abstraction only.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  consumer::{Consumer, ConsumerPatch, ConsumerWithPresence, NewConsumer},
  consumption::{Consumption, ConsumptionWithConsumer, NewConsumption},
  presence::{MarkPresence, Presence},
  report::{Report, ReportSnapshot},
  stats::{ConsumptionStats, DailyStats},
};

/// Abstraction over a Cantine backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CanteenStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  /// Prepare the backend for use. Must be safe to call repeatedly.
  fn init(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_ {
    async { Ok(()) }
  }

  // ── Consumers ─────────────────────────────────────────────────────────

  /// All consumers, ordered by name.
  fn list_consumers(
    &self,
  ) -> impl Future<Output = Result<Vec<Consumer>, Self::Error>> + Send + '_;

  /// Retrieve a consumer by id. Returns `None` if not found.
  fn get_consumer<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Consumer>, Self::Error>> + Send + 'a;

  /// Validate and persist a new consumer. Id and `created_at` are assigned
  /// by the store.
  fn create_consumer(
    &self,
    input: NewConsumer,
  ) -> impl Future<Output = Result<Consumer, Self::Error>> + Send + '_;

  /// Apply `patch` to an existing consumer. Fails with not-found if `id` is
  /// unknown.
  fn update_consumer<'a>(
    &'a self,
    id: &'a str,
    patch: ConsumerPatch,
  ) -> impl Future<Output = Result<Consumer, Self::Error>> + Send + 'a;

  /// Delete a consumer together with their presences and consumptions.
  /// Deleting an unknown id is a no-op.
  fn delete_consumer<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Presences ─────────────────────────────────────────────────────────

  /// Every consumer, ordered by name, flagged with their presence on `date`.
  fn consumers_with_presence(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<ConsumerWithPresence>, Self::Error>> + Send + '_;

  /// Mark a consumer present (upsert, returns the row) or absent (removes
  /// the row if any, returns `None`).
  fn mark_presence(
    &self,
    input: MarkPresence,
  ) -> impl Future<Output = Result<Option<Presence>, Self::Error>> + Send + '_;

  // ── Consumptions ──────────────────────────────────────────────────────

  /// The consumptions of `date`, newest first, each joined with its consumer.
  fn consumptions_by_date(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<ConsumptionWithConsumer>, Self::Error>> + Send + '_;

  /// Validate and persist a consumption. The amount must be a meal tier and
  /// the consumer must exist.
  fn create_consumption(
    &self,
    input: NewConsumption,
  ) -> impl Future<Output = Result<Consumption, Self::Error>> + Send + '_;

  /// Delete a consumption. Deleting an unknown id is a no-op.
  fn delete_consumption<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Statistics & reports ──────────────────────────────────────────────

  fn daily_stats(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<DailyStats, Self::Error>> + Send + '_;

  /// Revenue and tier counts for `date`.
  fn consumption_stats(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<ConsumptionStats, Self::Error>> + Send + '_ {
    async move {
      let rows = self.consumptions_by_date(date).await?;
      Ok(ConsumptionStats::tally(rows.iter().map(|row| &row.record)))
    }
  }

  /// The daily report. Backends without a document renderer return a
  /// structured snapshot of the day.
  fn daily_report(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_ {
    async move {
      let consumptions = self.consumptions_by_date(date).await?;
      let stats = ConsumptionStats::tally(consumptions.iter().map(|row| &row.record));
      Ok(Report::Snapshot(ReportSnapshot::local(date, consumptions, stats)))
    }
  }
}
