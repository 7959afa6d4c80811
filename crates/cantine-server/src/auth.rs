//! Cookie-session login.
//!
//! A single operator account is configured with an argon2 PHC hash. A
//! successful login mints a random token, hands it to the client in the
//! `cantine_session` cookie, and keeps only its SHA-256 digest server-side.

use std::{
  collections::HashMap,
  time::{Duration, Instant},
};

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  Json,
  extract::{Request, State},
  http::{HeaderMap, HeaderValue, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::{AppState, error::Error};

pub const SESSION_COOKIE: &str = "cantine_session";

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

impl AuthConfig {
  pub fn verify(&self, username: &str, password: &str) -> Result<(), Error> {
    if username != self.username {
      return Err(Error::InvalidCredentials);
    }

    let parsed_hash =
      PasswordHash::new(&self.password_hash).map_err(|_| Error::InvalidCredentials)?;

    Argon2::default()
      .verify_password(password.as_bytes(), &parsed_hash)
      .map_err(|_| Error::InvalidCredentials)
  }
}

// ─── Sessions ────────────────────────────────────────────────────────────────

struct Session {
  username:   String,
  expires_at: Instant,
}

/// Live sessions, keyed by the hex SHA-256 digest of their token.
pub struct SessionStore {
  ttl:      Duration,
  sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
  pub fn new(ttl: Duration) -> Self { Self { ttl, sessions: RwLock::new(HashMap::new()) } }

  pub fn ttl(&self) -> Duration { self.ttl }

  /// Open a session for `username` and return its bearer token.
  pub async fn create(&self, username: &str) -> String {
    let mut raw = [0u8; 32];
    OsRng.fill_bytes(&mut raw);
    let token = hex::encode(raw);

    let session = Session {
      username:   username.to_owned(),
      expires_at: Instant::now() + self.ttl,
    };
    let mut sessions = self.sessions.write().await;
    sessions.retain(|_, s| s.expires_at > Instant::now());
    sessions.insert(digest(&token), session);
    token
  }

  /// The user owning `token`, if the session is live.
  pub async fn lookup(&self, token: &str) -> Option<String> {
    let sessions = self.sessions.read().await;
    sessions
      .get(&digest(token))
      .filter(|s| s.expires_at > Instant::now())
      .map(|s| s.username.clone())
  }

  pub async fn revoke(&self, token: &str) {
    self.sessions.write().await.remove(&digest(token));
  }
}

fn digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// The session token carried by the request's `Cookie` header, if any.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == SESSION_COOKIE)
    .map(|(_, value)| value)
    .filter(|value| !value.is_empty())
}

fn session_cookie(token: &str, max_age: Duration) -> Result<HeaderValue, Error> {
  let cookie = format!(
    "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
    max_age.as_secs()
  );
  HeaderValue::from_str(&cookie).map_err(|_| Error::Unauthorized)
}

// ─── Middleware ──────────────────────────────────────────────────────────────

/// Reject requests without a live session with 401.
pub async fn require_session<S>(
  State(state): State<AppState<S>>,
  req: Request,
  next: Next,
) -> Response
where
  S: Send + Sync + 'static,
{
  let live = match session_token(req.headers()) {
    Some(token) => state.sessions.lookup(token).await.is_some(),
    None => false,
  };
  if !live {
    return Error::Unauthorized.into_response();
  }
  next.run(req).await
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct User {
  pub username: String,
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Response, Error>
where
  S: Send + Sync + 'static,
{
  if let Err(e) = state.auth.verify(&body.username, &body.password) {
    tracing::warn!(username = %body.username, "login rejected");
    return Err(e);
  }

  let token = state.sessions.create(&body.username).await;
  let cookie = session_cookie(&token, state.sessions.ttl())?;
  tracing::info!(username = %body.username, "session opened");

  let user = User { username: body.username };
  let mut res = Json(json!({ "success": true, "user": user })).into_response();
  res.headers_mut().insert(header::SET_COOKIE, cookie);
  Ok(res)
}

/// `POST /auth/logout`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: Send + Sync + 'static,
{
  if let Some(token) = session_token(&headers) {
    state.sessions.revoke(token).await;
  }

  let mut res = Json(json!({ "success": true })).into_response();
  res.headers_mut().insert(header::SET_COOKIE, session_cookie("", Duration::ZERO)?);
  Ok(res)
}

/// `GET /auth/user`
pub async fn current_user<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<Json<serde_json::Value>, Error>
where
  S: Send + Sync + 'static,
{
  let token = session_token(&headers).ok_or(Error::Unauthorized)?;
  let username = state.sessions.lookup(token).await.ok_or(Error::Unauthorized)?;
  let user = User { username };
  Ok(Json(json!({ "user": user })))
}
