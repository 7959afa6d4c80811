//! Tests for `DocStore`, in memory and on disk.

use std::collections::BTreeSet;

use cantine_core::{
  consumer::{Consumer, NewConsumer},
  consumption::{Consumption, NewConsumption},
  presence::{MarkPresence, Presence},
  snapshot::{ImportSummary, Snapshot},
  stats::ConsumptionStats,
};
use chrono::{DateTime, NaiveDate, Utc};

use crate::{DocStore, Error};

fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 1, d).unwrap() }

fn at() -> DateTime<Utc> { DateTime::from_timestamp(1_705_305_600, 0).unwrap() }

fn consumer(id: &str, name: &str) -> Consumer {
  NewConsumer::new(name, Some("Production")).into_consumer(id.into(), at())
}

fn presence(id: &str, consumer_id: &str, date: NaiveDate) -> Presence {
  MarkPresence::new(consumer_id, date, true).into_presence(id.into(), at())
}

fn meal(id: &str, consumer_id: &str, amount: u32, date: NaiveDate) -> Consumption {
  NewConsumption::new(consumer_id, amount, date).into_consumption(id.into(), at())
}

// ─── Initialization ──────────────────────────────────────────────────────────

#[tokio::test]
async fn init_is_idempotent() {
  let dir = tempfile::tempdir().unwrap();
  let store = DocStore::new(dir.path().join("db"));

  let (a, b, c) = tokio::join!(store.init(), store.init(), store.init());
  a.unwrap();
  b.unwrap();
  c.unwrap();
  store.init().await.unwrap();

  for collection in ["consumers", "presences", "consumptions"] {
    let file = dir.path().join("db").join(format!("{collection}.json"));
    assert_eq!(std::fs::read_to_string(file).unwrap(), "[]");
  }
}

#[tokio::test]
async fn operations_initialize_lazily() {
  let store = DocStore::in_memory();
  assert!(store.consumers().await.unwrap().is_empty());
}

#[tokio::test]
async fn unreadable_directory_is_an_initialization_error() {
  let dir = tempfile::tempdir().unwrap();
  let blocker = dir.path().join("not-a-dir");
  std::fs::write(&blocker, b"x").unwrap();

  let err = DocStore::new(&blocker).init().await.unwrap_err();
  assert!(matches!(err, Error::Initialization { .. }));
  assert!(matches!(
    cantine_core::Error::from(err),
    cantine_core::Error::Initialization(_)
  ));
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_id_is_a_conflict() {
  let store = DocStore::in_memory();
  store.add_consumer(consumer("c-1", "Awa")).await.unwrap();

  let err = store.add_consumer(consumer("c-1", "Binta")).await.unwrap_err();
  assert!(matches!(err, Error::Conflict { collection: "consumers", .. }));
  assert_eq!(store.consumer("c-1").await.unwrap().unwrap().name, "Awa");
}

#[tokio::test]
async fn put_replaces_and_reindexes() {
  let store = DocStore::in_memory();
  store.add_consumer(consumer("c-1", "Awa")).await.unwrap();

  let mut renamed = consumer("c-1", "Awa Kone");
  renamed.department = None;
  store.put_consumer(renamed).await.unwrap();

  assert!(store.consumers_named("Awa").await.unwrap().is_empty());
  assert_eq!(store.consumers_named("Awa Kone").await.unwrap().len(), 1);
  assert_eq!(store.consumers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_missing_id_is_a_noop() {
  let store = DocStore::in_memory();
  assert!(store.delete_consumer("ghost").await.unwrap().is_none());
  assert!(store.delete_consumption("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_a_consumer_does_not_cascade() {
  let store = DocStore::in_memory();
  store.add_consumer(consumer("c-1", "Awa")).await.unwrap();
  store.add_presence(presence("p-1", "c-1", day(15))).await.unwrap();

  store.delete_consumer("c-1").await.unwrap();
  assert_eq!(store.presences_of("c-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn bulk_delete_counts_existing_ids_only() {
  let store = DocStore::in_memory();
  store.add_consumer(consumer("c-1", "Awa")).await.unwrap();
  for i in 0..3 {
    store.add_consumption(meal(&format!("m-{i}"), "c-1", 700, day(15))).await.unwrap();
  }

  let ids: BTreeSet<String> = ["m-0", "m-2", "m-9"].map(String::from).into();
  assert_eq!(store.delete_consumptions(&ids).await.unwrap(), 2);
  assert_eq!(store.consumptions_of("c-1").await.unwrap().len(), 1);
}

// ─── Joins & filters ─────────────────────────────────────────────────────────

#[tokio::test]
async fn consumptions_filter_by_date_and_embed_consumer() {
  let store = DocStore::in_memory();
  store.add_consumer(consumer("c-1", "Awa")).await.unwrap();
  store.add_consumption(meal("m-1", "c-1", 700, day(15))).await.unwrap();
  store.add_consumption(meal("m-2", "c-1", 1000, day(16))).await.unwrap();
  store.add_consumption(meal("m-3", "ghost", 700, day(15))).await.unwrap();

  let rows = store.consumptions(Some(day(15))).await.unwrap();
  assert_eq!(rows.len(), 2);

  let joined = rows.iter().find(|r| r.record.id == "m-1").unwrap();
  assert_eq!(joined.consumer.as_ref().map(|c| c.name.as_str()), Some("Awa"));

  let dangling = rows.iter().find(|r| r.record.id == "m-3").unwrap();
  assert!(dangling.consumer.is_none());

  assert_eq!(store.consumptions(None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn presences_filter_by_date() {
  let store = DocStore::in_memory();
  store.add_consumer(consumer("c-1", "Awa")).await.unwrap();
  store.add_presence(presence("p-1", "c-1", day(15))).await.unwrap();
  store.add_presence(presence("p-2", "c-1", day(16))).await.unwrap();

  let rows = store.presences(Some(day(16))).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].record.id, "p-2");
  assert!(rows[0].consumer.is_some());
}

#[tokio::test]
async fn stats_tally_one_day() {
  let store = DocStore::in_memory();
  for (i, amount) in [700, 700, 1000].into_iter().enumerate() {
    store.add_consumption(meal(&format!("m-{i}"), "c-1", amount, day(15))).await.unwrap();
  }
  store.add_consumption(meal("m-x", "c-1", 1000, day(16))).await.unwrap();

  let stats = store.stats(day(15)).await.unwrap();
  assert_eq!(stats, ConsumptionStats { total: 2400, count700: 2, count1000: 1 });
  assert_eq!(store.stats(day(20)).await.unwrap(), ConsumptionStats::default());
}

// ─── Persistence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn records_survive_reopening() {
  let dir = tempfile::tempdir().unwrap();
  {
    let store = DocStore::new(dir.path());
    store.add_consumer(consumer("c-1", "Awa")).await.unwrap();
    store.add_consumption(meal("m-1", "c-1", 1000, day(15))).await.unwrap();
    store.delete_consumer("c-1").await.unwrap();
    store.add_consumer(consumer("c-2", "Binta")).await.unwrap();
  }

  let store = DocStore::new(dir.path());
  let consumers = store.consumers().await.unwrap();
  assert_eq!(consumers, vec![consumer("c-2", "Binta")]);
  // Indexes are rebuilt on load.
  assert_eq!(store.consumptions(Some(day(15))).await.unwrap().len(), 1);
}

#[tokio::test]
async fn clear_all_empties_every_collection() {
  let store = DocStore::in_memory();
  store.add_consumer(consumer("c-1", "Awa")).await.unwrap();
  store.add_presence(presence("p-1", "c-1", day(15))).await.unwrap();
  store.add_consumption(meal("m-1", "c-1", 700, day(15))).await.unwrap();

  store.clear_all().await.unwrap();
  let snapshot = store.export().await.unwrap();
  assert!(snapshot.consumers.is_empty());
  assert!(snapshot.presences.is_empty());
  assert!(snapshot.consumptions.is_empty());
}

#[tokio::test]
async fn import_skips_existing_ids() {
  let source = DocStore::in_memory();
  source.add_consumer(consumer("c-1", "Awa")).await.unwrap();
  source.add_consumer(consumer("c-2", "Binta")).await.unwrap();
  source.add_presence(presence("p-1", "c-1", day(15))).await.unwrap();
  source.add_consumption(meal("m-1", "c-2", 700, day(15))).await.unwrap();
  let snapshot = source.export().await.unwrap();

  let target = DocStore::in_memory();
  target.add_consumer(consumer("c-1", "Awa")).await.unwrap();

  let summary = target.import(snapshot).await.unwrap();
  assert_eq!(summary.consumers, 1);
  assert_eq!(summary.presences, 1);
  assert_eq!(summary.consumptions, 1);
  assert_eq!(summary.skipped, 1);
  assert_eq!(target.consumers().await.unwrap().len(), 2);
}

#[tokio::test]
async fn import_keeps_presences_consistent() {
  let store = DocStore::in_memory();
  store.add_consumer(consumer("c-1", "Awa")).await.unwrap();
  store.add_presence(presence("p-1", "c-1", day(15))).await.unwrap();

  let absent = Presence { is_present: false, ..presence("p-absent", "c-2", day(15)) };
  let snapshot = Snapshot {
    consumers:    vec![consumer("c-2", "Binta")],
    presences:    vec![
      presence("p-other", "c-1", day(15)),
      presence("p-ghost", "ghost", day(15)),
      absent,
      presence("p-2", "c-2", day(15)),
      presence("p-2-again", "c-2", day(15)),
    ],
    consumptions: vec![
      meal("m-1", "c-2", 700, day(15)),
      meal("m-ghost", "ghost", 1000, day(15)),
    ],
    exported_at:  at(),
  };

  let summary = store.import(snapshot).await.unwrap();
  assert_eq!(
    summary,
    ImportSummary { consumers: 1, presences: 1, consumptions: 1, skipped: 5 }
  );

  let rows = store.presences(Some(day(15))).await.unwrap();
  let mut ids: Vec<_> = rows.iter().map(|r| r.record.id.as_str()).collect();
  ids.sort();
  assert_eq!(ids, ["p-1", "p-2"]);
  assert!(rows.iter().all(|r| r.consumer.is_some()));
  assert!(store.consumptions_of("ghost").await.unwrap().is_empty());
}

#[tokio::test]
async fn imported_batch_is_persisted() {
  let dir = tempfile::tempdir().unwrap();
  let snapshot = Snapshot {
    consumers:    (0..50).map(|i| consumer(&format!("c-{i:02}"), &format!("N{i}"))).collect(),
    presences:    Vec::new(),
    consumptions: (0..50)
      .map(|i| meal(&format!("m-{i:02}"), &format!("c-{i:02}"), 700, day(15)))
      .collect(),
    exported_at:  at(),
  };

  let summary = DocStore::new(dir.path()).import(snapshot).await.unwrap();
  assert_eq!((summary.consumers, summary.consumptions, summary.skipped), (50, 50, 0));

  let reopened = DocStore::new(dir.path());
  assert_eq!(reopened.consumers().await.unwrap().len(), 50);
  assert_eq!(reopened.stats(day(15)).await.unwrap().total, 35_000);
}
