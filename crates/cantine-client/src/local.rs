//! [`LocalDocs`] — the offline backend.
//!
//! The document store only knows records and indexes. This layer adds what
//! the relational store gets from its schema: generated ids and timestamps,
//! referential checks, the cascade on consumer delete and the
//! one-row-per-day presence rule.

use std::collections::BTreeSet;

use cantine_core::{
  Error, Result,
  consumer::{Consumer, ConsumerPatch, ConsumerWithPresence, NewConsumer},
  consumption::{Consumption, ConsumptionWithConsumer, NewConsumption},
  new_id,
  presence::{MarkPresence, Presence},
  snapshot::{ImportSummary, Snapshot},
  stats::{ConsumptionStats, DailyStats},
  store::CanteenStore,
};
use cantine_store_doc::DocStore;
use chrono::{NaiveDate, Utc};

#[derive(Clone)]
pub struct LocalDocs {
  docs: DocStore,
}

impl LocalDocs {
  pub fn new(docs: DocStore) -> Self { Self { docs } }

  pub fn docs(&self) -> &DocStore { &self.docs }

  pub async fn export(&self) -> Result<Snapshot> { Ok(self.docs.export().await?) }

  pub async fn import(&self, snapshot: Snapshot) -> Result<ImportSummary> {
    Ok(self.docs.import(snapshot).await?)
  }

  async fn require_consumer(&self, id: &str) -> Result<Consumer> {
    self
      .docs
      .consumer(id)
      .await?
      .ok_or_else(|| Error::not_found("consumer", id))
  }
}

fn by_name(a: &Consumer, b: &Consumer) -> std::cmp::Ordering {
  a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id))
}

impl CanteenStore for LocalDocs {
  type Error = Error;

  async fn init(&self) -> Result<()> { Ok(self.docs.init().await?) }

  // ── Consumers ─────────────────────────────────────────────────────────────

  async fn list_consumers(&self) -> Result<Vec<Consumer>> {
    let mut consumers = self.docs.consumers().await?;
    consumers.sort_by(by_name);
    Ok(consumers)
  }

  async fn get_consumer(&self, id: &str) -> Result<Option<Consumer>> {
    Ok(self.docs.consumer(id).await?)
  }

  async fn create_consumer(&self, input: NewConsumer) -> Result<Consumer> {
    let consumer = input.validate()?.into_consumer(new_id(), Utc::now());
    self.docs.add_consumer(consumer.clone()).await?;
    tracing::debug!(id = %consumer.id, "consumer added");
    Ok(consumer)
  }

  async fn update_consumer(&self, id: &str, patch: ConsumerPatch) -> Result<Consumer> {
    let consumer = patch.apply(self.require_consumer(id).await?)?;
    self.docs.put_consumer(consumer.clone()).await?;
    Ok(consumer)
  }

  async fn delete_consumer(&self, id: &str) -> Result<()> {
    let presences: BTreeSet<String> =
      self.docs.presences_of(id).await?.into_iter().map(|p| p.id).collect();
    let consumptions: BTreeSet<String> =
      self.docs.consumptions_of(id).await?.into_iter().map(|m| m.id).collect();

    let presences = self.docs.delete_presences(&presences).await?;
    let consumptions = self.docs.delete_consumptions(&consumptions).await?;
    if self.docs.delete_consumer(id).await?.is_some() {
      tracing::debug!(%id, presences, consumptions, "consumer deleted");
    }
    Ok(())
  }

  // ── Presences ─────────────────────────────────────────────────────────────

  async fn consumers_with_presence(&self, date: NaiveDate) -> Result<Vec<ConsumerWithPresence>> {
    let present: BTreeSet<String> = self
      .docs
      .presences(Some(date))
      .await?
      .into_iter()
      .filter(|row| row.record.is_present)
      .map(|row| row.record.consumer_id)
      .collect();

    Ok(
      self
        .list_consumers()
        .await?
        .into_iter()
        .map(|consumer| {
          let is_present = present.contains(&consumer.id);
          ConsumerWithPresence { consumer, is_present }
        })
        .collect(),
    )
  }

  async fn mark_presence(&self, input: MarkPresence) -> Result<Option<Presence>> {
    let input = input.validate()?;
    self.require_consumer(&input.consumer_id).await?;

    let existing: Vec<Presence> = self
      .docs
      .presences_of(&input.consumer_id)
      .await?
      .into_iter()
      .filter(|p| p.date == input.date)
      .collect();

    if !input.is_present {
      let ids = existing.into_iter().map(|p| p.id).collect();
      self.docs.delete_presences(&ids).await?;
      return Ok(None);
    }

    let presence = match existing.into_iter().next() {
      Some(row) => {
        let row = Presence { is_present: true, ..row };
        self.docs.put_presence(row.clone()).await?;
        row
      }
      None => {
        let row = input.into_presence(new_id(), Utc::now());
        self.docs.add_presence(row.clone()).await?;
        row
      }
    };
    Ok(Some(presence))
  }

  // ── Consumptions ──────────────────────────────────────────────────────────

  async fn consumptions_by_date(&self, date: NaiveDate) -> Result<Vec<ConsumptionWithConsumer>> {
    let mut rows = self.docs.consumptions(Some(date)).await?;
    rows.sort_by(|a, b| {
      b.record
        .created_at
        .cmp(&a.record.created_at)
        .then_with(|| a.record.id.cmp(&b.record.id))
    });
    Ok(rows)
  }

  async fn create_consumption(&self, input: NewConsumption) -> Result<Consumption> {
    let input = input.validate()?;
    self.require_consumer(&input.consumer_id).await?;
    let consumption = input.into_consumption(new_id(), Utc::now());
    self.docs.add_consumption(consumption.clone()).await?;
    Ok(consumption)
  }

  async fn delete_consumption(&self, id: &str) -> Result<()> {
    self.docs.delete_consumption(id).await?;
    Ok(())
  }

  // ── Statistics ────────────────────────────────────────────────────────────

  async fn daily_stats(&self, date: NaiveDate) -> Result<DailyStats> {
    let rows = self.docs.consumptions(Some(date)).await?;
    let stats = ConsumptionStats::tally(rows.iter().map(|row| &row.record));
    let presences = self.docs.presences(Some(date)).await?;
    Ok(DailyStats {
      total_consumers:    self.docs.consumers().await?.len(),
      present_today:      presences.iter().filter(|row| row.record.is_present).count(),
      daily_consumptions: rows.len(),
      daily_revenue:      stats.total,
    })
  }

  async fn consumption_stats(&self, date: NaiveDate) -> Result<ConsumptionStats> {
    Ok(self.docs.stats(date).await?)
  }
}
