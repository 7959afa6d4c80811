//! Facade, local backend and remote adapter tests. The remote adapter runs
//! against an in-process `cantine-server` bound to an ephemeral port.

use std::time::Duration;

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use cantine_core::{
  Error as CoreError,
  consumer::{ConsumerPatch, NewConsumer},
  consumption::NewConsumption,
  presence::{MarkPresence, Presence},
  report::Report,
  store::CanteenStore,
};
use cantine_server::{AppState, auth::AuthConfig};
use cantine_store_doc::DocStore;
use cantine_store_sqlite::SqliteStore;
use chrono::{DateTime, NaiveDate, Utc};
use rand_core::OsRng;
use tokio::net::TcpListener;

use crate::{
  Canteen, LocalDocs, RemoteConfig, RemoteStore,
  mode::{ConnectivityFlag, Mode, ModeSelector, Preference},
};

fn day() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 1, 15).unwrap() }

fn local() -> LocalDocs { LocalDocs::new(DocStore::in_memory()) }

/// Serve a fresh in-memory server and return its base URL.
async fn serve() -> String {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(b"admin01", &salt)
    .unwrap()
    .to_string();
  let auth = AuthConfig { username: "admin".into(), password_hash: hash };
  let app = cantine_server::router(AppState::new(store, auth, Duration::from_secs(3600)));

  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
  format!("http://{addr}")
}

fn remote(base_url: &str, password: &str) -> RemoteStore {
  RemoteStore::new(RemoteConfig {
    base_url: base_url.to_owned(),
    username: "admin".into(),
    password: password.into(),
    ..RemoteConfig::default()
  })
  .unwrap()
}

// ── Local backend ────────────────────────────────────────────────────────────

#[tokio::test]
async fn local_consumers_are_sorted_and_normalized() {
  let store = local();
  store.create_consumer(NewConsumer::new("Moussa", Some("  "))).await.unwrap();
  store.create_consumer(NewConsumer::new(" Awa ", Some("RH"))).await.unwrap();

  let consumers = store.list_consumers().await.unwrap();
  let names: Vec<_> = consumers.iter().map(|c| c.name.as_str()).collect();
  assert_eq!(names, ["Awa", "Moussa"]);
  assert_eq!(consumers[1].department, None);
}

#[tokio::test]
async fn local_update_of_unknown_consumer_is_not_found() {
  let err = local()
    .update_consumer("ghost", ConsumerPatch { name: Some("X".into()), department: None })
    .await
    .unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn local_presence_is_one_row_per_day() {
  let store = local();
  let awa = store.create_consumer(NewConsumer::new("Awa", None)).await.unwrap();

  let first = store
    .mark_presence(MarkPresence::new(&awa.id, day(), true))
    .await
    .unwrap()
    .unwrap();
  let again = store
    .mark_presence(MarkPresence::new(&awa.id, day(), true))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(first.id, again.id);
  assert_eq!(store.docs().presences(Some(day())).await.unwrap().len(), 1);

  let view = store.consumers_with_presence(day()).await.unwrap();
  assert!(view[0].is_present);

  let cleared = store.mark_presence(MarkPresence::new(&awa.id, day(), false)).await.unwrap();
  assert!(cleared.is_none());
  assert!(store.docs().presences(Some(day())).await.unwrap().is_empty());
  assert!(!store.consumers_with_presence(day()).await.unwrap()[0].is_present);

  // Clearing twice is a no-op.
  store.mark_presence(MarkPresence::new(&awa.id, day(), false)).await.unwrap();
}

#[tokio::test]
async fn local_referential_checks() {
  let store = local();
  let err = store
    .create_consumption(NewConsumption::new("ghost", 700, day()))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::NotFound { entity: "consumer", .. }));

  let err = store.mark_presence(MarkPresence::new("ghost", day(), true)).await.unwrap_err();
  assert!(err.is_not_found());

  let awa = store.create_consumer(NewConsumer::new("Awa", None)).await.unwrap();
  let err = store
    .create_consumption(NewConsumption::new(&awa.id, 850, day()))
    .await
    .unwrap_err();
  assert!(err.is_validation());
}

#[tokio::test]
async fn local_delete_cascades() {
  let store = local();
  let awa = store.create_consumer(NewConsumer::new("Awa", None)).await.unwrap();
  let binta = store.create_consumer(NewConsumer::new("Binta", None)).await.unwrap();
  for id in [&awa.id, &binta.id] {
    store.mark_presence(MarkPresence::new(id, day(), true)).await.unwrap();
    store.create_consumption(NewConsumption::new(id, 700, day())).await.unwrap();
  }

  store.delete_consumer(&awa.id).await.unwrap();

  assert!(store.get_consumer(&awa.id).await.unwrap().is_none());
  assert!(store.docs().presences_of(&awa.id).await.unwrap().is_empty());
  assert!(store.docs().consumptions_of(&awa.id).await.unwrap().is_empty());
  assert_eq!(store.consumptions_by_date(day()).await.unwrap().len(), 1);

  // Unknown ids are a no-op.
  store.delete_consumer(&awa.id).await.unwrap();
  store.delete_consumption("ghost").await.unwrap();
}

#[tokio::test]
async fn local_consumptions_are_newest_first() {
  let store = local();
  let awa = store.create_consumer(NewConsumer::new("Awa", None)).await.unwrap();
  for (id, secs) in [("m-old", 1_705_305_600), ("m-new", 1_705_309_200)] {
    let at = DateTime::<Utc>::from_timestamp(secs, 0).unwrap();
    let row = NewConsumption::new(&awa.id, 700, day()).into_consumption(id.into(), at);
    store.docs().add_consumption(row).await.unwrap();
  }

  let rows = store.consumptions_by_date(day()).await.unwrap();
  let ids: Vec<_> = rows.iter().map(|r| r.record.id.as_str()).collect();
  assert_eq!(ids, ["m-new", "m-old"]);
  assert_eq!(rows[0].consumer.as_ref().map(|c| c.name.as_str()), Some("Awa"));
}

#[tokio::test]
async fn local_statistics_and_report() {
  let store = local();
  let awa = store.create_consumer(NewConsumer::new("Awa", None)).await.unwrap();
  store.create_consumer(NewConsumer::new("Binta", None)).await.unwrap();
  store.mark_presence(MarkPresence::new(&awa.id, day(), true)).await.unwrap();
  for amount in [700, 700, 1000] {
    store.create_consumption(NewConsumption::new(&awa.id, amount, day())).await.unwrap();
  }

  let stats = store.daily_stats(day()).await.unwrap();
  assert_eq!(stats.total_consumers, 2);
  assert_eq!(stats.present_today, 1);
  assert_eq!(stats.daily_consumptions, 3);
  assert_eq!(stats.daily_revenue, 2400);

  let tiers = store.consumption_stats(day()).await.unwrap();
  assert_eq!((tiers.count700, tiers.count1000), (2, 1));

  let Report::Snapshot(snapshot) = store.daily_report(day()).await.unwrap() else {
    panic!("local report should be a snapshot");
  };
  assert_eq!(snapshot.mode, "local");
  assert_eq!(snapshot.consumptions.len(), 3);
  assert_eq!(snapshot.stats.total, 2400);

  let empty = store.daily_stats(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()).await.unwrap();
  assert_eq!((empty.daily_consumptions, empty.daily_revenue), (0, 0));
}

#[tokio::test]
async fn local_present_today_counts_present_rows_only() {
  let store = local();
  let awa = store.create_consumer(NewConsumer::new("Awa", None)).await.unwrap();
  let binta = store.create_consumer(NewConsumer::new("Binta", None)).await.unwrap();
  store.mark_presence(MarkPresence::new(&awa.id, day(), true)).await.unwrap();
  let stale = Presence {
    is_present: false,
    ..MarkPresence::new(&binta.id, day(), true).into_presence("p-stale".into(), Utc::now())
  };
  store.docs().add_presence(stale).await.unwrap();

  let flagged = store
    .consumers_with_presence(day())
    .await
    .unwrap()
    .iter()
    .filter(|row| row.is_present)
    .count();
  assert_eq!(flagged, 1);
  assert_eq!(store.daily_stats(day()).await.unwrap().present_today, 1);
}

// ── Facade ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fixed_mode_only_touches_its_backend() {
  let canteen = Canteen::new(local(), SqliteStore::open_in_memory().await.unwrap(), Mode::Local);
  canteen.reload().await.unwrap();

  let awa = canteen.consumers().create(NewConsumer::new("Awa", None)).await.unwrap();
  canteen.consumptions().create(&awa.id, 1000, Some(day())).await.unwrap();

  assert_eq!(canteen.local().list_consumers().await.unwrap().len(), 1);
  assert!(canteen.remote().list_consumers().await.unwrap().is_empty());
  assert_eq!(canteen.statistics().daily(Some(day())).await.unwrap().daily_revenue, 1000);
}

#[tokio::test]
async fn facade_follows_connectivity_and_preference() {
  let dir = tempfile::tempdir().unwrap();
  let online = ConnectivityFlag::new(true);
  let preference = Preference::new(dir.path().join("local-mode"));
  let canteen = Canteen::new(
    local(),
    SqliteStore::open_in_memory().await.unwrap(),
    ModeSelector::new(online.clone(), preference.clone()),
  );
  assert_eq!(canteen.mode(), Mode::Remote);

  canteen.consumers().create(NewConsumer::new("Remote", None)).await.unwrap();

  online.set_online(false);
  assert_eq!(canteen.mode(), Mode::Local);
  assert!(canteen.consumers().list().await.unwrap().is_empty());
  canteen.consumers().create(NewConsumer::new("Local", None)).await.unwrap();

  online.set_online(true);
  preference.set_local_mode(true).unwrap();
  canteen.reload().await.unwrap();
  let names: Vec<_> =
    canteen.consumers().list().await.unwrap().into_iter().map(|c| c.name).collect();
  assert_eq!(names, ["Local"]);

  preference.set_local_mode(false).unwrap();
  let names: Vec<_> =
    canteen.consumers().list().await.unwrap().into_iter().map(|c| c.name).collect();
  assert_eq!(names, ["Remote"]);
}

#[tokio::test]
async fn facade_defaults_dates_to_today() {
  let canteen = Canteen::new(local(), SqliteStore::open_in_memory().await.unwrap(), Mode::Local);
  let awa = canteen.consumers().create(NewConsumer::new("Awa", None)).await.unwrap();

  let presence = canteen.presences().mark(&awa.id, None, true).await.unwrap().unwrap();
  assert_eq!(presence.date, cantine_core::time::today());

  canteen.consumptions().create(&awa.id, 700, None).await.unwrap();
  assert_eq!(canteen.consumptions().by_date(None).await.unwrap().len(), 1);
  assert!(canteen.presences().for_date(None).await.unwrap()[0].is_present);
}

#[tokio::test]
async fn facade_errors_use_the_shared_taxonomy() {
  let canteen = Canteen::new(local(), SqliteStore::open_in_memory().await.unwrap(), Mode::Remote);
  let err = canteen.consumptions().create("ghost", 700, Some(day())).await.unwrap_err();
  assert!(err.is_not_found());

  let err = canteen.consumers().create(NewConsumer::new("   ", None)).await.unwrap_err();
  assert!(err.is_validation());
}

// ── Remote adapter ───────────────────────────────────────────────────────────

#[tokio::test]
async fn remote_requires_a_session() {
  let base = serve().await;
  let anonymous = RemoteStore::new(RemoteConfig {
    base_url: base.clone(),
    ..RemoteConfig::default()
  })
    .unwrap();
  let err: CoreError = anonymous.list_consumers().await.unwrap_err().into();
  assert!(matches!(err, CoreError::Remote { status: 401, .. }));

  let err: CoreError = remote(&base, "wrong").init().await.unwrap_err().into();
  assert!(matches!(err, CoreError::Remote { status: 401, .. }));

  let store = remote(&base, "admin01");
  store.init().await.unwrap();
  assert!(store.list_consumers().await.unwrap().is_empty());
}

#[tokio::test]
async fn remote_round_trips() {
  let base = serve().await;
  let store = remote(&base, "admin01");
  store.init().await.unwrap();

  let awa = store.create_consumer(NewConsumer::new("Awa", Some("Cuisine"))).await.unwrap();
  assert_eq!(store.get_consumer(&awa.id).await.unwrap(), Some(awa.clone()));
  assert_eq!(store.get_consumer("ghost").await.unwrap(), None);

  let renamed = store
    .update_consumer(&awa.id, ConsumerPatch { name: Some("Awa K.".into()), department: None })
    .await
    .unwrap();
  assert_eq!(renamed.name, "Awa K.");
  assert_eq!(renamed.department.as_deref(), Some("Cuisine"));

  let presence = store.mark_presence(MarkPresence::new(&awa.id, day(), true)).await.unwrap();
  assert!(presence.is_some_and(|p| p.is_present));
  let view = store.consumers_with_presence(day()).await.unwrap();
  assert!(view[0].is_present);
  let cleared = store.mark_presence(MarkPresence::new(&awa.id, day(), false)).await.unwrap();
  assert!(cleared.is_none());

  for amount in [700, 1000] {
    store.create_consumption(NewConsumption::new(&awa.id, amount, day())).await.unwrap();
  }
  let rows = store.consumptions_by_date(day()).await.unwrap();
  assert_eq!(rows.len(), 2);
  assert_eq!(rows[0].consumer.as_ref().map(|c| c.name.as_str()), Some("Awa K."));

  let stats = store.daily_stats(day()).await.unwrap();
  assert_eq!(stats.daily_revenue, 1700);
  assert_eq!(stats.present_today, 0);

  let Report::Document(doc) = store.daily_report(day()).await.unwrap() else {
    panic!("remote report should be a document");
  };
  assert_eq!(doc.filename, "Rapport_Journalier_2024_01_15.txt");
  assert!(doc.content_type.starts_with("text/plain"));
  assert!(String::from_utf8(doc.body).unwrap().contains("Awa K."));

  store.delete_consumption(&rows[0].record.id).await.unwrap();
  store.delete_consumer(&awa.id).await.unwrap();
  assert!(store.consumptions_by_date(day()).await.unwrap().is_empty());
}

#[tokio::test]
async fn remote_errors_map_onto_the_taxonomy() {
  let base = serve().await;
  let store = remote(&base, "admin01");
  store.init().await.unwrap();

  let err: CoreError = store
    .create_consumption(NewConsumption::new("ghost", 700, day()))
    .await
    .unwrap_err()
    .into();
  assert!(matches!(err, CoreError::NotFound { entity: "consumer", .. }));

  let err: CoreError = store
    .update_consumer("ghost", ConsumerPatch::default())
    .await
    .unwrap_err()
    .into();
  assert!(err.is_not_found());

  let err: CoreError = store
    .create_consumption(NewConsumption::new("ghost", 850, day()))
    .await
    .unwrap_err()
    .into();
  assert!(err.is_validation());
}

#[tokio::test]
async fn unreachable_server_is_a_connectivity_error() {
  // Grab a free port, then close it again.
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let store = remote(&format!("http://{addr}"), "admin01");
  assert!(!store.probe().await);
  let err: CoreError = store.list_consumers().await.unwrap_err().into();
  assert!(matches!(err, CoreError::Connectivity(_)));
}
