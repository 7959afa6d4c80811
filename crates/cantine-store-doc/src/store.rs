//! [`DocStore`] — the on-device document store.

use std::{
  collections::BTreeSet,
  path::{Path, PathBuf},
  sync::Arc,
};

use cantine_core::{
  consumer::{Consumer, WithConsumer},
  consumption::{Consumption, ConsumptionWithConsumer},
  presence::{Presence, PresenceWithConsumer},
  snapshot::{ImportSummary, Snapshot},
  stats::ConsumptionStats,
};
use chrono::{NaiveDate, Utc};
use tokio::sync::OnceCell;

use crate::{
  Error, Result,
  collection::{Collection, Document},
  document::{CONSUMER_ID, DATE, NAME},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A document store rooted at one directory.
///
/// Cloning is cheap and clones share the same collections. The store opens
/// itself on first use; [`DocStore::init`] does the same thing eagerly.
#[derive(Clone)]
pub struct DocStore {
  inner: Arc<Inner>,
}

struct Inner {
  dir:         Option<PathBuf>,
  collections: OnceCell<Collections>,
}

struct Collections {
  consumers:    Collection<Consumer>,
  presences:    Collection<Presence>,
  consumptions: Collection<Consumption>,
}

impl Collections {
  async fn open(dir: Option<&Path>) -> Result<Self> {
    if let Some(dir) = dir {
      tokio::fs::create_dir_all(dir).await?;
    }
    let collections = Self {
      consumers:    Collection::load(dir).await?,
      presences:    Collection::load(dir).await?,
      consumptions: Collection::load(dir).await?,
    };
    tracing::info!(dir = ?dir, "document store ready");
    Ok(collections)
  }
}

impl DocStore {
  /// A store persisted under `dir`. Nothing touches the disk until first use.
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self::with_dir(Some(dir.into()))
  }

  /// A store that never touches the disk — useful for testing.
  pub fn in_memory() -> Self { Self::with_dir(None) }

  fn with_dir(dir: Option<PathBuf>) -> Self {
    Self { inner: Arc::new(Inner { dir, collections: OnceCell::new() }) }
  }

  pub fn dir(&self) -> Option<&Path> { self.inner.dir.as_deref() }

  /// Open the collections. Idempotent: concurrent and repeated callers all
  /// observe a single initialization. A failed attempt is retried by the
  /// next caller.
  pub async fn init(&self) -> Result<()> {
    self.collections().await.map(|_| ())
  }

  async fn collections(&self) -> Result<&Collections> {
    let dir = self.inner.dir.as_deref();
    self
      .inner
      .collections
      .get_or_try_init(|| async move {
        Collections::open(dir).await.map_err(|e| Error::Initialization {
          path:   dir.map(Path::to_path_buf).unwrap_or_default(),
          reason: e.to_string(),
        })
      })
      .await
  }

  // ── Consumers ─────────────────────────────────────────────────────────────

  pub async fn add_consumer(&self, consumer: Consumer) -> Result<()> {
    self.collections().await?.consumers.add(consumer).await
  }

  pub async fn consumer(&self, id: &str) -> Result<Option<Consumer>> {
    Ok(self.collections().await?.consumers.get(id).await)
  }

  pub async fn consumers(&self) -> Result<Vec<Consumer>> {
    Ok(self.collections().await?.consumers.get_all().await)
  }

  /// Consumers whose name is exactly `name`.
  pub async fn consumers_named(&self, name: &str) -> Result<Vec<Consumer>> {
    self.collections().await?.consumers.by_index(NAME, name).await
  }

  /// Replace a consumer record wholesale.
  pub async fn put_consumer(&self, consumer: Consumer) -> Result<()> {
    self.collections().await?.consumers.put(consumer).await
  }

  /// Delete the consumer record only. Their presences and consumptions are
  /// left in place.
  pub async fn delete_consumer(&self, id: &str) -> Result<Option<Consumer>> {
    self.collections().await?.consumers.delete(id).await
  }

  // ── Presences ─────────────────────────────────────────────────────────────

  pub async fn add_presence(&self, presence: Presence) -> Result<()> {
    self.collections().await?.presences.add(presence).await
  }

  pub async fn put_presence(&self, presence: Presence) -> Result<()> {
    self.collections().await?.presences.put(presence).await
  }

  /// Presences (all, or of one date) joined with their consumer.
  pub async fn presences(&self, date: Option<NaiveDate>) -> Result<Vec<PresenceWithConsumer>> {
    let c = self.collections().await?;
    let rows = match date {
      Some(date) => c.presences.by_index(DATE, &date.to_string()).await?,
      None => c.presences.get_all().await,
    };
    self.join(rows, |p| &p.consumer_id).await
  }

  /// Raw presence rows of one consumer.
  pub async fn presences_of(&self, consumer_id: &str) -> Result<Vec<Presence>> {
    self.collections().await?.presences.by_index(CONSUMER_ID, consumer_id).await
  }

  pub async fn delete_presence(&self, id: &str) -> Result<Option<Presence>> {
    self.collections().await?.presences.delete(id).await
  }

  pub async fn delete_presences(&self, ids: &BTreeSet<String>) -> Result<usize> {
    self.collections().await?.presences.delete_many(ids).await
  }

  // ── Consumptions ──────────────────────────────────────────────────────────

  pub async fn add_consumption(&self, consumption: Consumption) -> Result<()> {
    self.collections().await?.consumptions.add(consumption).await
  }

  /// Consumptions (all, or of one date) joined with their consumer.
  pub async fn consumptions(
    &self,
    date: Option<NaiveDate>,
  ) -> Result<Vec<ConsumptionWithConsumer>> {
    let c = self.collections().await?;
    let rows = match date {
      Some(date) => c.consumptions.by_index(DATE, &date.to_string()).await?,
      None => c.consumptions.get_all().await,
    };
    self.join(rows, |m| &m.consumer_id).await
  }

  /// Raw consumption rows of one consumer.
  pub async fn consumptions_of(&self, consumer_id: &str) -> Result<Vec<Consumption>> {
    self.collections().await?.consumptions.by_index(CONSUMER_ID, consumer_id).await
  }

  pub async fn delete_consumption(&self, id: &str) -> Result<Option<Consumption>> {
    self.collections().await?.consumptions.delete(id).await
  }

  pub async fn delete_consumptions(&self, ids: &BTreeSet<String>) -> Result<usize> {
    self.collections().await?.consumptions.delete_many(ids).await
  }

  // ── Statistics ────────────────────────────────────────────────────────────

  /// Revenue and tier counts of `date`'s consumptions.
  pub async fn stats(&self, date: NaiveDate) -> Result<ConsumptionStats> {
    let rows = self
      .collections()
      .await?
      .consumptions
      .by_index(DATE, &date.to_string())
      .await?;
    Ok(ConsumptionStats::tally(&rows))
  }

  // ── Whole-store utilities ─────────────────────────────────────────────────

  pub async fn clear_all(&self) -> Result<()> {
    let c = self.collections().await?;
    c.consumers.clear().await?;
    c.presences.clear().await?;
    c.consumptions.clear().await?;
    tracing::info!("document store cleared");
    Ok(())
  }

  pub async fn export(&self) -> Result<Snapshot> {
    let c = self.collections().await?;
    Ok(Snapshot {
      consumers:    c.consumers.get_all().await,
      presences:    c.presences.get_all().await,
      consumptions: c.consumptions.get_all().await,
      exported_at:  Utc::now(),
    })
  }

  /// Add the records of `snapshot` that keep the store consistent. Skipped:
  /// ids already taken, rows referencing an unknown consumer, absences, and
  /// presences whose (consumer, date) pair already has a row.
  pub async fn import(&self, snapshot: Snapshot) -> Result<ImportSummary> {
    let c = self.collections().await?;
    let mut summary = ImportSummary::default();

    let offered = snapshot.consumers.len();
    let taken = c.consumers.add_many(snapshot.consumers).await?;
    summary.consumers = offered - taken.len();
    summary.skipped += taken.len();

    let known: BTreeSet<String> =
      c.consumers.get_all().await.into_iter().map(|consumer| consumer.id).collect();
    let mut pairs: BTreeSet<(String, NaiveDate)> = c
      .presences
      .get_all()
      .await
      .into_iter()
      .map(|p| (p.consumer_id, p.date))
      .collect();

    let offered = snapshot.presences.len();
    let presences: Vec<Presence> = snapshot
      .presences
      .into_iter()
      .filter(|p| {
        p.is_present
          && known.contains(&p.consumer_id)
          && pairs.insert((p.consumer_id.clone(), p.date))
      })
      .collect();
    let kept = presences.len();
    let taken = c.presences.add_many(presences).await?;
    summary.presences = kept - taken.len();
    summary.skipped += offered - summary.presences;

    let offered = snapshot.consumptions.len();
    let consumptions: Vec<Consumption> = snapshot
      .consumptions
      .into_iter()
      .filter(|m| known.contains(&m.consumer_id))
      .collect();
    let kept = consumptions.len();
    let taken = c.consumptions.add_many(consumptions).await?;
    summary.consumptions = kept - taken.len();
    summary.skipped += offered - summary.consumptions;

    if summary.skipped > 0 {
      tracing::warn!(skipped = summary.skipped, "snapshot records skipped");
    }
    tracing::info!(?summary, "snapshot imported");
    Ok(summary)
  }

  // ── Join ──────────────────────────────────────────────────────────────────

  /// Attach the referenced consumer to each row. A dangling reference
  /// yields `consumer: None`.
  async fn join<T: Document>(
    &self,
    rows: Vec<T>,
    consumer_id: impl Fn(&T) -> &String,
  ) -> Result<Vec<WithConsumer<T>>> {
    let consumers = self.collections().await?.consumers.read().await;
    Ok(
      rows
        .into_iter()
        .map(|record| {
          let consumer = consumers.get(consumer_id(&record)).cloned();
          WithConsumer { record, consumer }
        })
        .collect(),
    )
  }
}
