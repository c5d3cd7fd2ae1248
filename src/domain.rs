use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Semantic roles declared by the user, mapped onto arbitrary source column
/// names. All three must name a column present in the CSV header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnMapping {
    pub date_column: String,
    pub item_column: String,
    pub quantity_column: String,
}

impl ColumnMapping {
    pub fn new(
        date_column: impl Into<String>,
        item_column: impl Into<String>,
        quantity_column: impl Into<String>,
    ) -> Self {
        Self {
            date_column: date_column.into(),
            item_column: item_column.into(),
            quantity_column: quantity_column.into(),
        }
    }

    /// Declared column names in reporting order (date, item, quantity).
    pub fn columns(&self) -> [&str; 3] {
        [&self.date_column, &self.item_column, &self.quantity_column]
    }
}

/// Time resolution of the pipeline: observations are truncated to this
/// bucket and forecast steps advance by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    Daily,
    Hourly,
}

impl Granularity {
    /// Mode tag used in the canonical output shape.
    pub fn mode(&self) -> &'static str {
        match self {
            Granularity::Daily => "per_product",
            Granularity::Hourly => "per_product_hourly",
        }
    }

    /// Format a bucket timestamp the way the output contract expects:
    /// bare ISO dates for daily buckets, RFC 3339 for hourly ones.
    pub fn format_ds(&self, ts: DateTime<Utc>) -> String {
        match self {
            Granularity::Daily => ts.format("%Y-%m-%d").to_string(),
            Granularity::Hourly => ts.to_rfc3339(),
        }
    }
}

/// One usable sales observation, produced by normalizing a raw CSV row.
/// The timestamp is already truncated to the requested bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub ts: DateTime<Utc>,
    pub item: String,
    pub quantity: f64,
}

/// One `(bucket, summed quantity)` entry of an item's history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub ts: DateTime<Utc>,
    pub y: f64,
}

/// Per-item history, ascending by timestamp. Keyed by the exact trimmed
/// item string; `BTreeMap` keeps serialized output stably ordered.
pub type ItemSeriesMap = BTreeMap<String, Vec<SeriesPoint>>;

/// One projected future bucket with its fixed-ratio bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub ds: String,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastMeta {
    pub model: String,
    pub regressors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemForecast {
    pub meta: ForecastMeta,
    pub forecast: Vec<ForecastPoint>,
}

/// The canonical result shape, stable across all entry points. Built fresh
/// per request and never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub mode: String,
    pub results: BTreeMap<String, ItemForecast>,
}

/// Per-reason drop counts surfaced in the ingest summary. Individual row
/// failures are absorbed; only these aggregates leave the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropCounts {
    pub bad_date: usize,
    pub empty_item: usize,
    pub bad_quantity: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.bad_date + self.empty_item + self.bad_quantity
    }
}

/// Outcome of one dedup-guarded ingest request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSummary {
    pub ok: bool,
    pub owner: String,
    pub upload_id: Option<Uuid>,
    pub fingerprint: String,
    pub rows_read: usize,
    pub rows_inserted: usize,
    pub rows_dropped: DropCounts,
    pub message: String,
}

/// One persisted forecast run: the mapping it was produced with and the
/// result blob, stored opaque per owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRun {
    pub id: Uuid,
    pub mapping: Option<ColumnMapping>,
    pub result: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl ForecastRun {
    pub fn new(mapping: Option<ColumnMapping>, result: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            mapping,
            result,
            created_at: Utc::now(),
        }
    }
}
