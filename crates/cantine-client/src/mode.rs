//! Which backend serves a call.
//!
//! The decision is re-evaluated on every facade call: offline devices always
//! use the local store, online ones follow the persisted preference.

use std::{
  fmt,
  path::{Path, PathBuf},
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use cantine_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Local,
  Remote,
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Mode::Local => "local",
      Mode::Remote => "remote",
    })
  }
}

/// Decides the [`Mode`] of the next call.
pub trait ModeResolver: Send + Sync {
  fn resolve(&self) -> Mode;
}

/// A fixed mode.
impl ModeResolver for Mode {
  fn resolve(&self) -> Mode { *self }
}

// ─── Connectivity ────────────────────────────────────────────────────────────

pub trait Connectivity: Send + Sync {
  fn is_online(&self) -> bool;
}

/// Connectivity state flipped by whoever watches the network.
#[derive(Debug, Clone)]
pub struct ConnectivityFlag(Arc<AtomicBool>);

impl ConnectivityFlag {
  pub fn new(online: bool) -> Self { Self(Arc::new(AtomicBool::new(online))) }

  pub fn set_online(&self, online: bool) { self.0.store(online, Ordering::Relaxed); }
}

impl Connectivity for ConnectivityFlag {
  fn is_online(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

// ─── Preference ──────────────────────────────────────────────────────────────

/// The "prefer local mode" flag, persisted as a small file holding `true`
/// or `false`. The file is read once when the preference is created; after
/// that the flag lives in memory, shared by every clone, so resolving a mode
/// never touches the filesystem.
#[derive(Debug, Clone)]
pub struct Preference {
  path:  PathBuf,
  local: Arc<AtomicBool>,
}

impl Preference {
  /// Load the flag from `path`. A missing or unreadable file means remote.
  pub fn new(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let local = std::fs::read_to_string(&path)
      .map(|flag| flag.trim() == "true")
      .unwrap_or(false);
    Self { path, local: Arc::new(AtomicBool::new(local)) }
  }

  pub fn path(&self) -> &Path { &self.path }

  pub fn is_local(&self) -> bool { self.local.load(Ordering::Relaxed) }

  /// Persist the flag, then apply it to the next resolved call.
  pub fn set_local_mode(&self, local: bool) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent).map_err(Error::storage)?;
    }
    std::fs::write(&self.path, if local { "true" } else { "false" }).map_err(Error::storage)?;
    self.local.store(local, Ordering::Relaxed);
    tracing::info!(local, "mode preference saved to {}", self.path.display());
    Ok(())
  }
}

// ─── Selector ────────────────────────────────────────────────────────────────

/// Local when offline or when the preference says so, remote otherwise.
pub struct ModeSelector<C> {
  connectivity: C,
  preference:   Preference,
}

impl<C: Connectivity> ModeSelector<C> {
  pub fn new(connectivity: C, preference: Preference) -> Self {
    Self { connectivity, preference }
  }

  pub fn preference(&self) -> &Preference { &self.preference }
}

impl<C: Connectivity> ModeResolver for ModeSelector<C> {
  fn resolve(&self) -> Mode {
    if !self.connectivity.is_online() || self.preference.is_local() {
      Mode::Local
    } else {
      Mode::Remote
    }
  }
}
