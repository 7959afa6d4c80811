//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use cantine_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  api_router(Arc::new(store))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn send_raw(app: &Router, uri: &str, content_type: &str, body: &'static str) -> Response {
  let request = Request::builder()
    .method("POST")
    .uri(uri)
    .header(header::CONTENT_TYPE, content_type)
    .body(Body::from(body))
    .unwrap();
  app.clone().oneshot(request).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

async fn create_consumer(app: &Router, name: &str) -> String {
  let resp = send(app, "POST", "/consumers", Some(json!({ "name": name }))).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  json_body(resp).await["id"].as_str().unwrap().to_owned()
}

// ── Consumers ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn consumers_crud() {
  let app = app().await;
  let id = create_consumer(&app, "Binta").await;
  create_consumer(&app, "Awa").await;

  let list = json_body(send(&app, "GET", "/consumers", None).await).await;
  let names: Vec<_> = list.as_array().unwrap().iter().map(|c| c["name"].clone()).collect();
  assert_eq!(names, [json!("Awa"), json!("Binta")]);

  let patch = json!({ "department": "RH" });
  let resp = send(&app, "PUT", &format!("/consumers/{id}"), Some(patch)).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["department"], "RH");

  let resp = send(&app, "DELETE", &format!("/consumers/{id}"), None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let resp = send(&app, "GET", &format!("/consumers/{id}"), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert!(json_body(resp).await["error"].is_string());
}

#[tokio::test]
async fn blank_consumer_name_is_400() {
  let app = app().await;
  let resp = send(&app, "POST", "/consumers", Some(json!({ "name": "  " }))).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_unknown_consumer_is_404() {
  let app = app().await;
  let resp = send(&app, "PUT", "/consumers/ghost", Some(json!({ "name": "X" }))).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rejected_bodies_report_json_errors() {
  let app = app().await;

  let resp = send_raw(&app, "/consumers", "application/json", "{\"name\":").await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert!(json_body(resp).await["error"].is_string());

  let resp = send_raw(&app, "/consumptions", "application/json", "{\"amount\":700}").await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  assert!(json_body(resp).await["error"].is_string());

  let resp = send_raw(&app, "/presences", "text/plain", "hello").await;
  assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
  assert!(json_body(resp).await["error"].is_string());
}

// ── Presences ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn mark_present_then_absent() {
  let app = app().await;
  let id = create_consumer(&app, "Awa").await;

  let body = json!({ "consumerId": id, "date": "2024-01-15", "isPresent": true });
  let resp = send(&app, "POST", "/presences", Some(body)).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  assert_eq!(json_body(resp).await["isPresent"], true);

  let view = json_body(send(&app, "GET", "/presences/2024-01-15", None).await).await;
  assert_eq!(view[0]["isPresent"], true);

  let body = json!({ "consumerId": id, "date": "2024-01-15", "isPresent": false });
  let resp = send(&app, "POST", "/presences", Some(body)).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let view = json_body(send(&app, "GET", "/presences/2024-01-15", None).await).await;
  assert_eq!(view[0]["isPresent"], false);
}

#[tokio::test]
async fn malformed_presence_date_is_400() {
  let app = app().await;
  let resp = send(&app, "GET", "/presences/15-01-2024", None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ── Consumptions & statistics ────────────────────────────────────────────────

#[tokio::test]
async fn consumptions_and_statistics() {
  let app = app().await;
  let id = create_consumer(&app, "Awa").await;

  for amount in [700, 700, 1000] {
    let body = json!({ "consumerId": id, "amount": amount, "date": "2024-01-15" });
    let resp = send(&app, "POST", "/consumptions", Some(body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
  }

  let rows = json_body(send(&app, "GET", "/consumptions?date=2024-01-15", None).await).await;
  let rows = rows.as_array().unwrap();
  assert_eq!(rows.len(), 3);
  assert_eq!(rows[0]["consumer"]["name"], "Awa");

  let stats = json_body(send(&app, "GET", "/statistics?date=2024-01-15", None).await).await;
  assert_eq!(stats["dailyRevenue"], 2400);
  assert_eq!(stats["dailyConsumptions"], 3);
  assert_eq!(stats["totalConsumers"], 1);

  let doomed = rows[0]["id"].as_str().unwrap();
  let resp = send(&app, "DELETE", &format!("/consumptions/{doomed}"), None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn consumption_without_date_lands_today() {
  let app = app().await;
  let id = create_consumer(&app, "Awa").await;

  let meal = json!({ "consumerId": id, "amount": 700 });
  let resp = send(&app, "POST", "/consumptions", Some(meal)).await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let rows = json_body(send(&app, "GET", "/consumptions", None).await).await;
  assert_eq!(rows.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_amount_is_400() {
  let app = app().await;
  let id = create_consumer(&app, "Awa").await;
  let body = json!({ "consumerId": id, "amount": 850, "date": "2024-01-15" });
  let resp = send(&app, "POST", "/consumptions", Some(body)).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_consumer_consumption_is_404() {
  let app = app().await;
  let body = json!({ "consumerId": "ghost", "amount": 700, "date": "2024-01-15" });
  let resp = send(&app, "POST", "/consumptions", Some(body)).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Report ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn report_is_an_attachment() {
  let app = app().await;
  let id = create_consumer(&app, "Awa").await;
  let body = json!({ "consumerId": id, "amount": 1000, "date": "2024-01-15" });
  send(&app, "POST", "/consumptions", Some(body)).await;

  let resp = send(&app, "GET", "/report?date=2024-01-15", None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_owned();
  assert!(disposition.starts_with("attachment"));
  assert!(disposition.contains("Rapport_Journalier_2024_01_15"));

  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let text = String::from_utf8(bytes.to_vec()).unwrap();
  assert!(text.contains("Awa"));
  assert!(text.contains("Total journalier: 1000 FCFA"));
}
