//! Async HTTP client wrapping the Cantine JSON API.
//!
//! One request per operation, no caching and no retries. The session cookie
//! obtained by [`RemoteStore::login`] is kept in the client's cookie jar.

use std::time::Duration;

use cantine_core::{
  consumer::{Consumer, ConsumerPatch, ConsumerWithPresence, NewConsumer},
  consumption::{Consumption, ConsumptionWithConsumer, NewConsumption},
  presence::{MarkPresence, Presence},
  report::{Report, ReportDocument, document_filename},
  stats::DailyStats,
  store::CanteenStore,
};
use chrono::NaiveDate;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;

use crate::error::{Error, Result};

/// Connection settings for the Cantine API.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
  pub timeout:  Duration,
}

impl Default for RemoteConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:5000".into(),
      username: String::new(),
      password: String::new(),
      timeout:  Duration::from_secs(30),
    }
  }
}

/// Async HTTP client for the Cantine JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based, and
/// clones share the cookie jar.
#[derive(Clone)]
pub struct RemoteStore {
  client: Client,
  config: RemoteConfig,
}

impl RemoteStore {
  pub fn new(config: RemoteConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .cookie_store(true)
      .build()
      .map_err(|source| Error::Transport { url: config.base_url.clone(), source })?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    self.client.request(method, self.url(path))
  }

  /// `POST /api/auth/login`. A no-op when no username is configured.
  pub async fn login(&self) -> Result<()> {
    if self.config.username.is_empty() {
      return Ok(());
    }
    let body = json!({ "username": self.config.username, "password": self.config.password });
    let request = self.request(Method::POST, "/auth/login").json(&body);
    self.send(Method::POST, "/auth/login", request).await?;
    tracing::info!(username = %self.config.username, "logged in to {}", self.config.base_url);
    Ok(())
  }

  /// Whether the server answers at all. Any HTTP response counts, even an
  /// error status.
  pub async fn probe(&self) -> bool {
    self
      .request(Method::GET, "/auth/user")
      .timeout(Duration::from_secs(3))
      .send()
      .await
      .is_ok()
  }

  // ── Plumbing ──────────────────────────────────────────────────────────────

  /// Send `req`, turning transport failures and non-success statuses into
  /// errors.
  async fn send(&self, method: Method, path: &str, req: RequestBuilder) -> Result<Response> {
    let resp = req.send().await.map_err(|source| Error::Transport { url: self.url(path), source })?;

    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }

    // Error bodies are `{"error": "<message>"}`; fall back to the reason.
    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|v| v.get("error").and_then(|m| m.as_str()).map(str::to_owned))
      .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_owned());

    Err(Error::Status {
      method: method_name(&method),
      path: path.to_owned(),
      status: status.as_u16(),
      message,
    })
  }

  async fn get<T: DeserializeOwned>(&self, path: &str, date: Option<NaiveDate>) -> Result<T> {
    let mut req = self.request(Method::GET, path);
    if let Some(date) = date {
      req = req.query(&[("date", date.to_string())]);
    }
    let resp = self.send(Method::GET, path, req).await?;
    decode(path, resp).await
  }

  async fn write<B: Serialize, T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    body: &B,
  ) -> Result<T> {
    let resp = self.send(method.clone(), path, self.request(method, path).json(body)).await?;
    decode(path, resp).await
  }

  async fn delete(&self, path: &str) -> Result<()> {
    self.send(Method::DELETE, path, self.request(Method::DELETE, path)).await?;
    Ok(())
  }
}

async fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T> {
  resp.json().await.map_err(|source| Error::Decode { path: path.to_owned(), source })
}

fn method_name(method: &Method) -> &'static str {
  match *method {
    Method::GET => "GET",
    Method::POST => "POST",
    Method::PUT => "PUT",
    Method::DELETE => "DELETE",
    _ => "HTTP",
  }
}

// ─── CanteenStore impl ───────────────────────────────────────────────────────

impl CanteenStore for RemoteStore {
  type Error = Error;

  async fn init(&self) -> Result<()> { self.login().await }

  // ── Consumers ─────────────────────────────────────────────────────────────

  /// `GET /api/consumers`
  async fn list_consumers(&self) -> Result<Vec<Consumer>> { self.get("/consumers", None).await }

  /// `GET /api/consumers/{id}`
  async fn get_consumer(&self, id: &str) -> Result<Option<Consumer>> {
    match self.get(&format!("/consumers/{id}"), None).await {
      Ok(consumer) => Ok(Some(consumer)),
      Err(Error::Status { status: 404, .. }) => Ok(None),
      Err(e) => Err(e),
    }
  }

  /// `POST /api/consumers`
  async fn create_consumer(&self, input: NewConsumer) -> Result<Consumer> {
    let input = input.validate()?;
    self.write(Method::POST, "/consumers", &input).await
  }

  /// `PUT /api/consumers/{id}`
  async fn update_consumer(&self, id: &str, patch: ConsumerPatch) -> Result<Consumer> {
    self.write(Method::PUT, &format!("/consumers/{id}"), &patch).await
  }

  /// `DELETE /api/consumers/{id}`
  async fn delete_consumer(&self, id: &str) -> Result<()> {
    self.delete(&format!("/consumers/{id}")).await
  }

  // ── Presences ─────────────────────────────────────────────────────────────

  /// `GET /api/presences/{date}`
  async fn consumers_with_presence(&self, date: NaiveDate) -> Result<Vec<ConsumerWithPresence>> {
    self.get(&format!("/presences/{date}"), None).await
  }

  /// `POST /api/presences` — 201 with the row, 204 once cleared.
  async fn mark_presence(&self, input: MarkPresence) -> Result<Option<Presence>> {
    let input = input.validate()?;
    let path = "/presences";
    let resp = self.send(Method::POST, path, self.request(Method::POST, path).json(&input)).await?;
    if resp.status() == StatusCode::NO_CONTENT {
      return Ok(None);
    }
    decode(path, resp).await.map(Some)
  }

  // ── Consumptions ──────────────────────────────────────────────────────────

  /// `GET /api/consumptions?date=`
  async fn consumptions_by_date(&self, date: NaiveDate) -> Result<Vec<ConsumptionWithConsumer>> {
    self.get("/consumptions", Some(date)).await
  }

  /// `POST /api/consumptions`
  async fn create_consumption(&self, input: NewConsumption) -> Result<Consumption> {
    let input = input.validate()?;
    self.write(Method::POST, "/consumptions", &input).await
  }

  /// `DELETE /api/consumptions/{id}`
  async fn delete_consumption(&self, id: &str) -> Result<()> {
    self.delete(&format!("/consumptions/{id}")).await
  }

  // ── Statistics & reports ──────────────────────────────────────────────────

  /// `GET /api/statistics?date=`
  async fn daily_stats(&self, date: NaiveDate) -> Result<DailyStats> {
    self.get("/statistics", Some(date)).await
  }

  /// `GET /api/report?date=` — the server-rendered document.
  async fn daily_report(&self, date: NaiveDate) -> Result<Report> {
    let path = "/report";
    let req = self.request(Method::GET, path).query(&[("date", date.to_string())]);
    let resp = self.send(Method::GET, path, req).await?;

    let headers = resp.headers();
    let content_type = headers
      .get(header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .unwrap_or("application/octet-stream")
      .to_owned();
    let filename = headers
      .get(header::CONTENT_DISPOSITION)
      .and_then(|v| v.to_str().ok())
      .and_then(attachment_filename)
      .unwrap_or_else(|| document_filename(date, "txt"));

    let body = resp
      .bytes()
      .await
      .map_err(|source| Error::Decode { path: path.to_owned(), source })?;

    Ok(Report::Document(ReportDocument { filename, content_type, body: body.to_vec() }))
  }
}

/// The `filename` parameter of a `Content-Disposition` header.
fn attachment_filename(disposition: &str) -> Option<String> {
  disposition
    .split(';')
    .filter_map(|part| part.trim().strip_prefix("filename="))
    .map(|name| name.trim_matches('"').to_owned())
    .find(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn filename_is_read_from_disposition() {
    assert_eq!(
      attachment_filename("attachment; filename=\"Rapport_Journalier_2024_01_15.txt\"").as_deref(),
      Some("Rapport_Journalier_2024_01_15.txt")
    );
    assert_eq!(attachment_filename("attachment").as_deref(), None);
  }

  #[test]
  fn statuses_map_onto_the_shared_taxonomy() {
    let status = |status: u16, message: &str| Error::Status {
      method: "GET",
      path: "/consumers/x".into(),
      status,
      message: message.into(),
    };

    let e: cantine_core::Error = status(404, "consumer not found: x").into();
    assert!(matches!(e, cantine_core::Error::NotFound { entity: "consumer", .. }));
    let e: cantine_core::Error = status(409, "taken").into();
    assert!(matches!(e, cantine_core::Error::Conflict(_)));
    let e: cantine_core::Error = status(422, "bad json").into();
    assert!(e.is_validation());
    let e: cantine_core::Error = status(401, "not authenticated").into();
    assert!(matches!(e, cantine_core::Error::Remote { status: 401, .. }));
  }
}
