//! HTTP service for Cantine.
//!
//! Mounts the JSON API of `cantine-api` under `/api`, behind a cookie-session
//! login served at `/api/auth/*`.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router, middleware,
  routing::{get, post},
};
use cantine_core::store::CanteenStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, SessionStore};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CANTINE_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  #[serde(default = "default_store_path")]
  pub store_path:         PathBuf,
  #[serde(default = "default_username")]
  pub auth_username:      String,
  pub auth_password_hash: String,
  #[serde(default = "default_session_hours")]
  pub session_hours:      u64,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 5000 }
fn default_store_path() -> PathBuf { PathBuf::from("cantine.db") }
fn default_username() -> String { "admin".into() }
fn default_session_hours() -> u64 { 24 }

impl ServerConfig {
  pub fn session_ttl(&self) -> Duration { Duration::from_secs(self.session_hours * 60 * 60) }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the session handlers.
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub auth:     Arc<AuthConfig>,
  pub sessions: Arc<SessionStore>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      auth:     self.auth.clone(),
      sessions: self.sessions.clone(),
    }
  }
}

impl<S> AppState<S> {
  pub fn new(store: S, auth: AuthConfig, session_ttl: Duration) -> Self {
    Self {
      store:    Arc::new(store),
      auth:     Arc::new(auth),
      sessions: Arc::new(SessionStore::new(session_ttl)),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full service router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: CanteenStore + 'static,
{
  let protected = cantine_api::api_router(state.store.clone()).layer(
    middleware::from_fn_with_state(state.clone(), auth::require_session::<S>),
  );

  let sessions = Router::new()
    .route("/auth/login", post(auth::login::<S>))
    .route("/auth/logout", post(auth::logout::<S>))
    .route("/auth/user", get(auth::current_user::<S>))
    .with_state(state);

  Router::new()
    .nest("/api", sessions.merge(protected))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
