//! [`SqliteStore`] — the SQLite implementation of [`CanteenStore`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::OptionalExtension as _;

use cantine_core::{
  consumer::{Consumer, ConsumerPatch, ConsumerWithPresence, NewConsumer, WithConsumer},
  consumption::{Consumption, ConsumptionWithConsumer, NewConsumption},
  new_id,
  presence::{MarkPresence, Presence, PresenceWithConsumer},
  snapshot::{ImportSummary, Snapshot},
  stats::{ConsumptionStats, DailyStats},
  store::CanteenStore,
};

use crate::{
  Error, Result,
  encode::{
    CONSUMER_COLUMNS, CONSUMPTION_COLUMNS, PRESENCE_COLUMNS, RawConsumer,
    RawConsumerWithPresence, RawConsumption, RawConsumptionWithConsumer, RawPresence,
    encode_date, encode_dt,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Cantine store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path.as_ref()).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::info!(path = %path.as_ref().display(), "sqlite store opened");
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn require_consumer(&self, id: &str) -> Result<()> {
    let id_str = id.to_owned();
    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row("SELECT 1 FROM consumers WHERE id = ?1", [id_str], |_| Ok(()))
            .optional()?
            .is_some(),
        )
      })
      .await?;

    if exists { Ok(()) } else { Err(Error::ConsumerNotFound(id.to_owned())) }
  }

  async fn insert_consumer(&self, consumer: &Consumer) -> Result<()> {
    let id = consumer.id.clone();
    let name = consumer.name.clone();
    let department = consumer.department.clone();
    let at_str = encode_dt(consumer.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO consumers (id, name, department, created_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id, name, department, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Utilities beyond the backend contract ─────────────────────────────────

  /// The presence rows of `date`, each joined with its consumer.
  pub async fn presences_by_date(&self, date: NaiveDate) -> Result<Vec<PresenceWithConsumer>> {
    let date_str = encode_date(date);

    let raws: Vec<(RawPresence, Option<RawConsumer>)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PRESENCE_COLUMNS}, {CONSUMER_COLUMNS}
           FROM presences p
           LEFT JOIN consumers c ON c.id = p.consumer_id
           WHERE p.date = ?1
           ORDER BY c.name, p.id"
        ))?;
        let rows = stmt
          .query_map([date_str], |row| {
            Ok((RawPresence::from_row(row, 0)?, RawConsumer::from_joined_row(row, 5)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(presence, consumer)| {
        Ok(WithConsumer {
          record:   presence.into_presence()?,
          consumer: consumer.map(RawConsumer::into_consumer).transpose()?,
        })
      })
      .collect()
  }

  /// Every record in the store.
  pub async fn export_snapshot(&self) -> Result<Snapshot> {
    let (consumers, presences, consumptions) = self
      .conn
      .call(|conn| {
        let consumers = conn
          .prepare(&format!("SELECT {CONSUMER_COLUMNS} FROM consumers c ORDER BY c.name, c.id"))?
          .query_map([], |row| RawConsumer::from_row(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let presences = conn
          .prepare(&format!("SELECT {PRESENCE_COLUMNS} FROM presences p ORDER BY p.date, p.id"))?
          .query_map([], |row| RawPresence::from_row(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let consumptions = conn
          .prepare(&format!(
            "SELECT {CONSUMPTION_COLUMNS} FROM consumptions m ORDER BY m.date, m.created_at, m.id"
          ))?
          .query_map([], |row| RawConsumption::from_row(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((consumers, presences, consumptions))
      })
      .await?;

    Ok(Snapshot {
      consumers:    consumers.into_iter().map(RawConsumer::into_consumer).collect::<Result<_>>()?,
      presences:    presences.into_iter().map(RawPresence::into_presence).collect::<Result<_>>()?,
      consumptions: consumptions
        .into_iter()
        .map(RawConsumption::into_consumption)
        .collect::<Result<_>>()?,
      exported_at:  Utc::now(),
    })
  }

  /// Insert every record of `snapshot` in one transaction. Skipped: ids
  /// already taken, rows referencing an unknown consumer, absences, and
  /// presences that duplicate a (consumer, date) pair.
  pub async fn import_snapshot(&self, snapshot: Snapshot) -> Result<ImportSummary> {
    let summary = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut summary = ImportSummary::default();
        let mut total = 0;

        {
          let mut insert = tx.prepare(
            "INSERT OR IGNORE INTO consumers (id, name, department, created_at)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for c in &snapshot.consumers {
            total += 1;
            summary.consumers += insert.execute(rusqlite::params![
              c.id,
              c.name,
              c.department,
              encode_dt(c.created_at)
            ])?;
          }

          let mut insert = tx.prepare(
            "INSERT OR IGNORE INTO presences (id, consumer_id, date, is_present, created_at)
             SELECT ?1, ?2, ?3, ?4, ?5
             WHERE ?4 AND EXISTS (SELECT 1 FROM consumers WHERE id = ?2)",
          )?;
          for p in &snapshot.presences {
            total += 1;
            summary.presences += insert.execute(rusqlite::params![
              p.id,
              p.consumer_id,
              encode_date(p.date),
              p.is_present,
              encode_dt(p.created_at)
            ])?;
          }

          let mut insert = tx.prepare(
            "INSERT OR IGNORE INTO consumptions (id, consumer_id, amount, date, created_at)
             SELECT ?1, ?2, ?3, ?4, ?5 WHERE EXISTS (SELECT 1 FROM consumers WHERE id = ?2)",
          )?;
          for m in &snapshot.consumptions {
            total += 1;
            summary.consumptions += insert.execute(rusqlite::params![
              m.id,
              m.consumer_id,
              m.amount,
              encode_date(m.date),
              encode_dt(m.created_at)
            ])?;
          }
        }

        tx.commit()?;
        summary.skipped = total - summary.consumers - summary.presences - summary.consumptions;
        Ok(summary)
      })
      .await?;

    tracing::info!(?summary, "snapshot imported");
    Ok(summary)
  }
}

// ─── CanteenStore impl ───────────────────────────────────────────────────────

impl CanteenStore for SqliteStore {
  type Error = Error;

  // ── Consumers ─────────────────────────────────────────────────────────────

  async fn list_consumers(&self) -> Result<Vec<Consumer>> {
    let raws: Vec<RawConsumer> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {CONSUMER_COLUMNS} FROM consumers c ORDER BY c.name, c.id"))?;
        let rows = stmt
          .query_map([], |row| RawConsumer::from_row(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawConsumer::into_consumer).collect()
  }

  async fn get_consumer(&self, id: &str) -> Result<Option<Consumer>> {
    let id_str = id.to_owned();

    let raw: Option<RawConsumer> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CONSUMER_COLUMNS} FROM consumers c WHERE c.id = ?1"),
              [id_str],
              |row| RawConsumer::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawConsumer::into_consumer).transpose()
  }

  async fn create_consumer(&self, input: NewConsumer) -> Result<Consumer> {
    let consumer = input.validate()?.into_consumer(new_id(), Utc::now());
    self.insert_consumer(&consumer).await?;
    tracing::debug!(id = %consumer.id, "consumer created");
    Ok(consumer)
  }

  async fn update_consumer(&self, id: &str, patch: ConsumerPatch) -> Result<Consumer> {
    let current = self
      .get_consumer(id)
      .await?
      .ok_or_else(|| Error::ConsumerNotFound(id.to_owned()))?;
    let updated = patch.apply(current)?;

    let id_str = updated.id.clone();
    let name = updated.name.clone();
    let department = updated.department.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE consumers SET name = ?2, department = ?3 WHERE id = ?1",
          rusqlite::params![id_str, name, department],
        )?;
        Ok(())
      })
      .await?;

    Ok(updated)
  }

  async fn delete_consumer(&self, id: &str) -> Result<()> {
    let id_str = id.to_owned();

    // Presences and consumptions go with it through ON DELETE CASCADE.
    let removed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM consumers WHERE id = ?1", [id_str])?))
      .await?;

    tracing::debug!(%id, removed, "consumer deleted");
    Ok(())
  }

  // ── Presences ─────────────────────────────────────────────────────────────

  async fn consumers_with_presence(&self, date: NaiveDate) -> Result<Vec<ConsumerWithPresence>> {
    let date_str = encode_date(date);

    let raws: Vec<RawConsumerWithPresence> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONSUMER_COLUMNS}, COALESCE(p.is_present, 0)
           FROM consumers c
           LEFT JOIN presences p ON p.consumer_id = c.id AND p.date = ?1
           ORDER BY c.name, c.id"
        ))?;
        let rows = stmt
          .query_map([date_str], |row| {
            Ok(RawConsumerWithPresence {
              consumer:   RawConsumer::from_row(row, 0)?,
              is_present: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawConsumerWithPresence::into_view).collect()
  }

  async fn mark_presence(&self, input: MarkPresence) -> Result<Option<Presence>> {
    let input = input.validate()?;
    self.require_consumer(&input.consumer_id).await?;

    let consumer_id = input.consumer_id.clone();
    let date_str = encode_date(input.date);

    if !input.is_present {
      self
        .conn
        .call(move |conn| {
          conn.execute(
            "DELETE FROM presences WHERE consumer_id = ?1 AND date = ?2",
            rusqlite::params![consumer_id, date_str],
          )?;
          Ok(())
        })
        .await?;
      return Ok(None);
    }

    let candidate = input.into_presence(new_id(), Utc::now());
    let id_str = candidate.id.clone();
    let at_str = encode_dt(candidate.created_at);

    let raw: RawPresence = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO presences (id, consumer_id, date, is_present, created_at)
           VALUES (?1, ?2, ?3, 1, ?4)
           ON CONFLICT (consumer_id, date) DO UPDATE SET is_present = 1",
          rusqlite::params![id_str, consumer_id, date_str, at_str],
        )?;
        Ok(conn.query_row(
          &format!(
            "SELECT {PRESENCE_COLUMNS} FROM presences p WHERE p.consumer_id = ?1 AND p.date = ?2"
          ),
          rusqlite::params![consumer_id, date_str],
          |row| RawPresence::from_row(row, 0),
        )?)
      })
      .await?;

    raw.into_presence().map(Some)
  }

  // ── Consumptions ──────────────────────────────────────────────────────────

  async fn consumptions_by_date(&self, date: NaiveDate) -> Result<Vec<ConsumptionWithConsumer>> {
    let date_str = encode_date(date);

    let raws: Vec<RawConsumptionWithConsumer> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONSUMPTION_COLUMNS}, {CONSUMER_COLUMNS}
           FROM consumptions m
           LEFT JOIN consumers c ON c.id = m.consumer_id
           WHERE m.date = ?1
           ORDER BY m.created_at DESC, m.id"
        ))?;
        let rows = stmt
          .query_map([date_str], |row| {
            Ok(RawConsumptionWithConsumer {
              consumption: RawConsumption::from_row(row, 0)?,
              consumer:    RawConsumer::from_joined_row(row, 5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawConsumptionWithConsumer::into_joined).collect()
  }

  async fn create_consumption(&self, input: NewConsumption) -> Result<Consumption> {
    let input = input.validate()?;
    self.require_consumer(&input.consumer_id).await?;

    let consumption = input.into_consumption(new_id(), Utc::now());
    let id_str = consumption.id.clone();
    let consumer_id = consumption.consumer_id.clone();
    let amount = consumption.amount;
    let date_str = encode_date(consumption.date);
    let at_str = encode_dt(consumption.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO consumptions (id, consumer_id, amount, date, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, consumer_id, amount, date_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(consumption)
  }

  async fn delete_consumption(&self, id: &str) -> Result<()> {
    let id_str = id.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM consumptions WHERE id = ?1", [id_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Statistics ────────────────────────────────────────────────────────────

  async fn daily_stats(&self, date: NaiveDate) -> Result<DailyStats> {
    let date_str = encode_date(date);

    let (total_consumers, present_today, daily_consumptions, daily_revenue): (
      i64,
      i64,
      i64,
      i64,
    ) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT
             (SELECT COUNT(*) FROM consumers),
             (SELECT COUNT(*) FROM presences WHERE date = ?1 AND is_present = 1),
             (SELECT COUNT(*) FROM consumptions WHERE date = ?1),
             (SELECT COALESCE(SUM(amount), 0) FROM consumptions WHERE date = ?1)",
          [date_str],
          |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?)
      })
      .await?;

    Ok(DailyStats {
      total_consumers:    total_consumers as usize,
      present_today:      present_today as usize,
      daily_consumptions: daily_consumptions as usize,
      daily_revenue:      daily_revenue as u64,
    })
  }

  async fn consumption_stats(&self, date: NaiveDate) -> Result<ConsumptionStats> {
    let date_str = encode_date(date);

    let (total, count700, count1000): (i64, i64, i64) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT
             COALESCE(SUM(amount), 0),
             COALESCE(SUM(amount = 700), 0),
             COALESCE(SUM(amount = 1000), 0)
           FROM consumptions WHERE date = ?1",
          [date_str],
          |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?)
      })
      .await?;

    Ok(ConsumptionStats {
      total:     total as u64,
      count700:  count700 as usize,
      count1000: count1000 as usize,
    })
  }
}
