//! `GET /report?date=` — the printable daily report.
//!
//! Rendered as a plain-text table: one numbered line per consumption with
//! the consumer's name and the amount, followed by the day's totals.

use std::sync::Arc;

use axum::{
  extract::{Query, State},
  http::header,
  response::IntoResponse,
};
use cantine_core::{
  consumption::ConsumptionWithConsumer,
  report::{ReportDocument, document_filename},
  stats::ConsumptionStats,
  store::CanteenStore,
};
use chrono::NaiveDate;

use crate::{DateParams, error::ApiError};

pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

const TITLE: &str = "Rapport Journalier des Consommations";
const UNKNOWN_CONSUMER: &str = "(consommateur inconnu)";

/// `GET /report[?date=YYYY-MM-DD]`
pub async fn daily<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<DateParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CanteenStore,
{
  let date = params.resolve()?;
  let rows = store.consumptions_by_date(date).await.map_err(ApiError::store)?;
  let stats = store.consumption_stats(date).await.map_err(ApiError::store)?;

  let doc = render(date, &rows, &stats);
  tracing::info!(%date, rows = rows.len(), "daily report rendered");

  Ok((
    [
      (header::CONTENT_TYPE, doc.content_type),
      (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", doc.filename)),
    ],
    doc.body,
  ))
}

/// Lay out the report for `date`. Rows keep the order they are given in.
pub fn render(
  date: NaiveDate,
  rows: &[ConsumptionWithConsumer],
  stats: &ConsumptionStats,
) -> ReportDocument {
  let names: Vec<&str> = rows
    .iter()
    .map(|row| row.consumer.as_ref().map_or(UNKNOWN_CONSUMER, |c| c.name.as_str()))
    .collect();
  let name_width = names
    .iter()
    .map(|n| n.chars().count())
    .chain(["NOMS ET PRENOMS".len()])
    .max()
    .unwrap_or_default();
  let number_width = rows.len().to_string().len().max("N°".chars().count());

  let mut lines = vec![
    TITLE.to_owned(),
    format!("Date: {}", date.format("%d/%m/%Y")),
    String::new(),
    format!("{:<number_width$}  {:<name_width$}  Consommation", "N°", "NOMS ET PRENOMS"),
    "-".repeat(number_width + name_width + 16),
  ];
  lines.extend(rows.iter().zip(&names).enumerate().map(|(i, (row, name))| {
    format!("{:<number_width$}  {:<name_width$}  {} FCFA", i + 1, name, row.record.amount)
  }));
  lines.extend([
    String::new(),
    format!("Total journalier: {} FCFA", stats.total),
    format!("Nombre de consommations: {}", rows.len()),
    format!("Repas à 700 FCFA: {}", stats.count700),
    format!("Repas à 1000 FCFA: {}", stats.count1000),
  ]);

  let mut out = lines.join("\n");
  out.push('\n');

  ReportDocument {
    filename:     document_filename(date, "txt"),
    content_type: CONTENT_TYPE.to_owned(),
    body:         out.into_bytes(),
  }
}
