//! A single keyed record collection with secondary indexes.
//!
//! The whole collection lives in memory behind an async mutex, which also
//! serializes writers: operations on one collection complete in the order
//! they acquired the lock. Every write rewrites the backing file (temp file
//! plus rename) before the in-memory state changes, so a failed write leaves
//! both untouched.

use std::{
  collections::{BTreeMap, BTreeSet, HashMap},
  iter,
  path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::{Mutex, MutexGuard};

use crate::{Error, Result};

// ─── Document ────────────────────────────────────────────────────────────────

/// A record type that can live in a collection.
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
  /// Collection name; also the stem of the backing file.
  const COLLECTION: &'static str;
  /// Names of the secondary indexes maintained for this collection.
  const INDEXES: &'static [&'static str];

  fn key(&self) -> &str;

  /// Value of `index` for this record, or `None` to leave it unindexed.
  fn index_value(&self, index: &str) -> Option<String>;
}

// ─── State ───────────────────────────────────────────────────────────────────

type Index = BTreeMap<String, BTreeSet<String>>;

struct State<T> {
  records: BTreeMap<String, T>,
  indexes: HashMap<&'static str, Index>,
}

impl<T: Document> State<T> {
  fn new(rows: Vec<T>) -> Self {
    let mut state = Self {
      records: BTreeMap::new(),
      indexes: T::INDEXES.iter().map(|name| (*name, Index::new())).collect(),
    };
    for row in rows {
      state.insert(row);
    }
    state
  }

  fn insert(&mut self, record: T) {
    if let Some(old) = self.records.remove(record.key()) {
      self.unindex(&old);
    }
    for (name, index) in &mut self.indexes {
      if let Some(value) = record.index_value(name) {
        index.entry(value).or_default().insert(record.key().to_owned());
      }
    }
    self.records.insert(record.key().to_owned(), record);
  }

  fn remove(&mut self, id: &str) -> Option<T> {
    let old = self.records.remove(id)?;
    self.unindex(&old);
    Some(old)
  }

  fn unindex(&mut self, record: &T) {
    for (name, index) in &mut self.indexes {
      if let Some(value) = record.index_value(name)
        && let Some(ids) = index.get_mut(&value)
      {
        ids.remove(record.key());
        if ids.is_empty() {
          index.remove(&value);
        }
      }
    }
  }

  fn lookup(&self, index: &str, value: &str) -> Result<Vec<T>> {
    let idx = self.indexes.get(index).ok_or_else(|| Error::UnknownIndex {
      collection: T::COLLECTION,
      index:      index.to_owned(),
    })?;
    Ok(
      idx
        .get(value)
        .into_iter()
        .flatten()
        .filter_map(|id| self.records.get(id))
        .cloned()
        .collect(),
    )
  }
}

// ─── Collection ──────────────────────────────────────────────────────────────

pub(crate) struct Collection<T> {
  file:  Option<PathBuf>,
  state: Mutex<State<T>>,
}

impl<T: Document> Collection<T> {
  /// Load the collection from `dir`, creating an empty file if none exists.
  /// `None` keeps the collection in memory only.
  pub async fn load(dir: Option<&Path>) -> Result<Self> {
    let file = dir.map(|d| d.join(format!("{}.json", T::COLLECTION)));

    let rows: Vec<T> = match &file {
      Some(path) => match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
        Ok(bytes) => serde_json::from_slice(&bytes)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
          write_atomically(path, b"[]").await?;
          Vec::new()
        }
        Err(e) => return Err(e.into()),
      },
      None => Vec::new(),
    };

    tracing::debug!(collection = T::COLLECTION, records = rows.len(), "collection loaded");
    Ok(Self { file, state: Mutex::new(State::new(rows)) })
  }

  /// Insert a new record. Fails if the id is taken.
  pub async fn add(&self, record: T) -> Result<()> {
    let mut state = self.state.lock().await;
    if state.records.contains_key(record.key()) {
      return Err(Error::Conflict {
        collection: T::COLLECTION,
        id:         record.key().to_owned(),
      });
    }
    self.flush(state.records.values().chain(iter::once(&record))).await?;
    state.insert(record);
    Ok(())
  }

  /// Insert every record whose id is free with a single file rewrite.
  /// Returns the records turned away because their id was already stored
  /// or appeared earlier in the batch.
  pub async fn add_many(&self, records: Vec<T>) -> Result<Vec<T>> {
    let mut state = self.state.lock().await;
    let mut fresh: BTreeMap<String, T> = BTreeMap::new();
    let mut taken = Vec::new();
    for record in records {
      if state.records.contains_key(record.key()) || fresh.contains_key(record.key()) {
        taken.push(record);
      } else {
        fresh.insert(record.key().to_owned(), record);
      }
    }
    if fresh.is_empty() {
      return Ok(taken);
    }

    self.flush(state.records.values().chain(fresh.values())).await?;
    for record in fresh.into_values() {
      state.insert(record);
    }
    Ok(taken)
  }

  /// Insert or fully replace the record with the same id.
  pub async fn put(&self, record: T) -> Result<()> {
    let mut state = self.state.lock().await;
    let rows = state
      .records
      .values()
      .filter(|r| r.key() != record.key())
      .chain(iter::once(&record));
    self.flush(rows).await?;
    state.insert(record);
    Ok(())
  }

  /// Remove a record by id, returning it if it existed.
  pub async fn delete(&self, id: &str) -> Result<Option<T>> {
    let mut state = self.state.lock().await;
    if !state.records.contains_key(id) {
      return Ok(None);
    }
    self.flush(state.records.values().filter(|r| r.key() != id)).await?;
    Ok(state.remove(id))
  }

  /// Remove every record whose id is in `ids`; returns how many went.
  pub async fn delete_many(&self, ids: &BTreeSet<String>) -> Result<usize> {
    let mut state = self.state.lock().await;
    let doomed = ids.iter().filter(|id| state.records.contains_key(*id)).count();
    if doomed == 0 {
      return Ok(0);
    }
    self.flush(state.records.values().filter(|r| !ids.contains(r.key()))).await?;
    for id in ids {
      state.remove(id);
    }
    Ok(doomed)
  }

  pub async fn clear(&self) -> Result<()> {
    let mut state = self.state.lock().await;
    self.flush(iter::empty()).await?;
    *state = State::new(Vec::new());
    Ok(())
  }

  pub async fn get(&self, id: &str) -> Option<T> {
    self.state.lock().await.records.get(id).cloned()
  }

  pub async fn get_all(&self) -> Vec<T> {
    self.state.lock().await.records.values().cloned().collect()
  }

  /// All records whose `index` equals `value`.
  pub async fn by_index(&self, index: &str, value: &str) -> Result<Vec<T>> {
    self.state.lock().await.lookup(index, value)
  }

  /// Hold the lock for a multi-step read (e.g. join enrichment).
  pub async fn read(&self) -> Reader<'_, T> {
    Reader(self.state.lock().await)
  }

  async fn flush<'r>(&self, rows: impl Iterator<Item = &'r T>) -> Result<()> {
    let Some(path) = &self.file else { return Ok(()) };
    let rows: Vec<&T> = rows.collect();
    let bytes = serde_json::to_vec(&rows)?;
    write_atomically(path, &bytes).await
  }
}

/// Read guard over a collection's records.
pub(crate) struct Reader<'a, T>(MutexGuard<'a, State<T>>);

impl<T: Document> Reader<'_, T> {
  pub fn get(&self, id: &str) -> Option<&T> { self.0.records.get(id) }
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
  let tmp = path.with_extension("json.tmp");
  tokio::fs::write(&tmp, bytes).await?;
  tokio::fs::rename(&tmp, path).await?;
  Ok(())
}
