//! Daily reports.
//!
//! The server renders a document; an offline backend can only hand back the
//! raw figures. Callers receive whichever form the active backend produced.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{consumption::ConsumptionWithConsumer, stats::ConsumptionStats};

#[derive(Debug, Clone)]
pub enum Report {
  /// A rendered document, ready to save.
  Document(ReportDocument),
  /// Structured data for the day, produced when no renderer is reachable.
  Snapshot(ReportSnapshot),
}

impl Report {
  /// Suggested file name for saving the report.
  pub fn filename(&self) -> String {
    match self {
      Report::Document(doc) => doc.filename.clone(),
      Report::Snapshot(snap) => format!("Rapport_Local_{}.json", snap.date),
    }
  }
}

#[derive(Debug, Clone)]
pub struct ReportDocument {
  pub filename:     String,
  pub content_type: String,
  pub body:         Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSnapshot {
  pub date:         NaiveDate,
  pub consumptions: Vec<ConsumptionWithConsumer>,
  pub stats:        ConsumptionStats,
  pub mode:         String,
}

impl ReportSnapshot {
  pub fn local(
    date: NaiveDate,
    consumptions: Vec<ConsumptionWithConsumer>,
    stats: ConsumptionStats,
  ) -> Self {
    Self { date, consumptions, stats, mode: "local".into() }
  }
}

/// Conventional file name of a rendered daily report.
pub fn document_filename(date: NaiveDate, extension: &str) -> String {
  format!("Rapport_Journalier_{}.{extension}", date.format("%Y_%m_%d"))
}
