//! [`Canteen`] — one data-access surface over both backends.
//!
//! Every call resolves the mode first, then delegates to the local or the
//! remote backend and normalizes what comes back, so callers see the same
//! shapes whichever side answered.

use cantine_core::{
  Result,
  consumer::{Consumer, ConsumerPatch, ConsumerWithPresence, NewConsumer, normalize_department},
  consumption::{Consumption, ConsumptionWithConsumer, NewConsumption},
  presence::{MarkPresence, Presence},
  report::Report,
  stats::{ConsumptionStats, DailyStats},
  store::CanteenStore,
  time::today,
};
use chrono::NaiveDate;

use crate::mode::{Mode, ModeResolver};

/// Dispatch `$call` to the backend picked by the resolver, bound as
/// `$store`, and lift its error into the shared taxonomy.
macro_rules! route {
  ($canteen:expr, $op:literal, |$store:ident| $call:expr) => {{
    let canteen = $canteen;
    let mode = canteen.mode.resolve();
    tracing::debug!(%mode, op = $op, "dispatch");
    match mode {
      Mode::Local => {
        let $store = &canteen.local;
        $call.await.map_err(Into::<cantine_core::Error>::into)
      }
      Mode::Remote => {
        let $store = &canteen.remote;
        $call.await.map_err(Into::<cantine_core::Error>::into)
      }
    }
  }};
}

pub struct Canteen<L, R, M> {
  local:  L,
  remote: R,
  mode:   M,
}

impl<L, R, M> Canteen<L, R, M>
where
  L: CanteenStore,
  R: CanteenStore,
  M: ModeResolver,
{
  pub fn new(local: L, remote: R, mode: M) -> Self { Self { local, remote, mode } }

  /// The mode the next call will use.
  pub fn mode(&self) -> Mode { self.mode.resolve() }

  pub fn resolver(&self) -> &M { &self.mode }

  pub fn local(&self) -> &L { &self.local }

  pub fn remote(&self) -> &R { &self.remote }

  /// Initialize the backend of the current mode. Call again after the mode
  /// preference changes.
  pub async fn reload(&self) -> Result<()> {
    route!(self, "init", |store| store.init())?;
    tracing::info!(mode = %self.mode(), "data access ready");
    Ok(())
  }

  pub fn consumers(&self) -> Consumers<'_, L, R, M> { Consumers(self) }

  pub fn presences(&self) -> Presences<'_, L, R, M> { Presences(self) }

  pub fn consumptions(&self) -> Consumptions<'_, L, R, M> { Consumptions(self) }

  pub fn statistics(&self) -> Statistics<'_, L, R, M> { Statistics(self) }

  pub fn reports(&self) -> Reports<'_, L, R, M> { Reports(self) }
}

// ─── Consumers ───────────────────────────────────────────────────────────────

pub struct Consumers<'a, L, R, M>(&'a Canteen<L, R, M>);

impl<L, R, M> Consumers<'_, L, R, M>
where
  L: CanteenStore,
  R: CanteenStore,
  M: ModeResolver,
{
  /// All consumers, ordered by name.
  pub async fn list(&self) -> Result<Vec<Consumer>> {
    let mut consumers: Vec<Consumer> =
      route!(self.0, "consumers.list", |store| store.list_consumers())?
        .into_iter()
        .map(normalize_consumer)
        .collect();
    consumers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    Ok(consumers)
  }

  pub async fn get(&self, id: &str) -> Result<Option<Consumer>> {
    let consumer = route!(self.0, "consumers.get", |store| store.get_consumer(id))?;
    Ok(consumer.map(normalize_consumer))
  }

  pub async fn create(&self, input: NewConsumer) -> Result<Consumer> {
    let consumer = route!(self.0, "consumers.create", |store| store.create_consumer(input))?;
    Ok(normalize_consumer(consumer))
  }

  pub async fn update(&self, id: &str, patch: ConsumerPatch) -> Result<Consumer> {
    let consumer = route!(self.0, "consumers.update", |store| store.update_consumer(id, patch))?;
    Ok(normalize_consumer(consumer))
  }

  /// Delete a consumer with their presences and consumptions.
  pub async fn delete(&self, id: &str) -> Result<()> {
    route!(self.0, "consumers.delete", |store| store.delete_consumer(id))
  }
}

// ─── Presences ───────────────────────────────────────────────────────────────

pub struct Presences<'a, L, R, M>(&'a Canteen<L, R, M>);

impl<L, R, M> Presences<'_, L, R, M>
where
  L: CanteenStore,
  R: CanteenStore,
  M: ModeResolver,
{
  /// Every consumer with their presence flag on `date` (today if `None`).
  pub async fn for_date(&self, date: Option<NaiveDate>) -> Result<Vec<ConsumerWithPresence>> {
    let date = date.unwrap_or_else(today);
    let mut rows: Vec<ConsumerWithPresence> =
      route!(self.0, "presences.for_date", |store| store.consumers_with_presence(date))?
        .into_iter()
        .map(|row| ConsumerWithPresence { consumer: normalize_consumer(row.consumer), ..row })
        .collect();
    rows.sort_by(|a, b| {
      a.consumer.name.cmp(&b.consumer.name).then_with(|| a.consumer.id.cmp(&b.consumer.id))
    });
    Ok(rows)
  }

  /// Mark present (returns the row) or absent (removes it, returns `None`).
  pub async fn mark(
    &self,
    consumer_id: &str,
    date: Option<NaiveDate>,
    is_present: bool,
  ) -> Result<Option<Presence>> {
    let input = MarkPresence::new(consumer_id, date.unwrap_or_else(today), is_present);
    route!(self.0, "presences.mark", |store| store.mark_presence(input))
  }
}

// ─── Consumptions ────────────────────────────────────────────────────────────

pub struct Consumptions<'a, L, R, M>(&'a Canteen<L, R, M>);

impl<L, R, M> Consumptions<'_, L, R, M>
where
  L: CanteenStore,
  R: CanteenStore,
  M: ModeResolver,
{
  /// The consumptions of `date` (today if `None`), newest first.
  pub async fn by_date(&self, date: Option<NaiveDate>) -> Result<Vec<ConsumptionWithConsumer>> {
    let date = date.unwrap_or_else(today);
    let mut rows: Vec<ConsumptionWithConsumer> =
      route!(self.0, "consumptions.by_date", |store| store.consumptions_by_date(date))?
        .into_iter()
        .map(|row| ConsumptionWithConsumer {
          consumer: row.consumer.map(normalize_consumer),
          ..row
        })
        .collect();
    rows.sort_by(|a, b| {
      b.record
        .created_at
        .cmp(&a.record.created_at)
        .then_with(|| a.record.id.cmp(&b.record.id))
    });
    Ok(rows)
  }

  pub async fn create(
    &self,
    consumer_id: &str,
    amount: u32,
    date: Option<NaiveDate>,
  ) -> Result<Consumption> {
    let input = NewConsumption::new(consumer_id, amount, date.unwrap_or_else(today));
    route!(self.0, "consumptions.create", |store| store.create_consumption(input))
  }

  pub async fn delete(&self, id: &str) -> Result<()> {
    route!(self.0, "consumptions.delete", |store| store.delete_consumption(id))
  }
}

// ─── Statistics ──────────────────────────────────────────────────────────────

pub struct Statistics<'a, L, R, M>(&'a Canteen<L, R, M>);

impl<L, R, M> Statistics<'_, L, R, M>
where
  L: CanteenStore,
  R: CanteenStore,
  M: ModeResolver,
{
  pub async fn daily(&self, date: Option<NaiveDate>) -> Result<DailyStats> {
    let date = date.unwrap_or_else(today);
    route!(self.0, "statistics.daily", |store| store.daily_stats(date))
  }

  /// Revenue and tier counts.
  pub async fn consumption(&self, date: Option<NaiveDate>) -> Result<ConsumptionStats> {
    let date = date.unwrap_or_else(today);
    route!(self.0, "statistics.consumption", |store| store.consumption_stats(date))
  }
}

// ─── Reports ─────────────────────────────────────────────────────────────────

pub struct Reports<'a, L, R, M>(&'a Canteen<L, R, M>);

impl<L, R, M> Reports<'_, L, R, M>
where
  L: CanteenStore,
  R: CanteenStore,
  M: ModeResolver,
{
  /// The rendered document in remote mode, a structured snapshot locally.
  pub async fn daily(&self, date: Option<NaiveDate>) -> Result<Report> {
    let date = date.unwrap_or_else(today);
    route!(self.0, "reports.daily", |store| store.daily_report(date))
  }
}

fn normalize_consumer(mut consumer: Consumer) -> Consumer {
  consumer.department = normalize_department(consumer.department.take());
  consumer
}
