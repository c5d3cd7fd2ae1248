//! Metrics for the ingestion and forecast pipeline.
//!
//! All metric names live in the [`MetricName`] catalog so stages never pass
//! magic strings. CLI invocations are short-lived and cannot be scraped, so
//! when `DEMANDCAST_PUSHGATEWAY_URL` is set each recorded metric is also
//! pushed to the gateway as it happens.

use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::info;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Ingest metrics
    IngestUploadsReceived,
    IngestUploadBytes,
    IngestUploadsDeduplicated,
    IngestRowsNormalized,
    IngestRowsDropped,
    IngestRowsInserted,

    // Forecast metrics
    ForecastsProduced,
    ForecastItems,
    ForecastHorizon,
    ForecastRunsSaved,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::IngestUploadsReceived => "demandcast_ingest_uploads_received_total",
            MetricName::IngestUploadBytes => "demandcast_ingest_upload_bytes",
            MetricName::IngestUploadsDeduplicated => "demandcast_ingest_uploads_deduplicated_total",
            MetricName::IngestRowsNormalized => "demandcast_ingest_rows_normalized_total",
            MetricName::IngestRowsDropped => "demandcast_ingest_rows_dropped_total",
            MetricName::IngestRowsInserted => "demandcast_ingest_rows_inserted_total",

            MetricName::ForecastsProduced => "demandcast_forecasts_produced_total",
            MetricName::ForecastItems => "demandcast_forecast_items",
            MetricName::ForecastHorizon => "demandcast_forecast_horizon",
            MetricName::ForecastRunsSaved => "demandcast_forecast_runs_saved_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

struct MetricsState {
    handle: metrics_exporter_prometheus::PrometheusHandle,
    pushgateway_url: String,
    job: String,
    instance: String,
}

static METRICS_HANDLE: OnceLock<Arc<MetricsState>> = OnceLock::new();

/// Initialize the metrics system with optional push gateway support
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    init_with_push_options(None, None)
}

/// Initialize with push gateway configuration
pub fn init_with_push_options(
    job_name: Option<&str>,
    instance: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;

    if let Ok(pushgateway_url) = std::env::var("DEMANDCAST_PUSHGATEWAY_URL") {
        let job = job_name.unwrap_or("demandcast");
        let inst = instance.unwrap_or("default");

        METRICS_HANDLE
            .set(Arc::new(MetricsState {
                handle,
                pushgateway_url,
                job: job.to_string(),
                instance: inst.to_string(),
            }))
            .ok();

        info!("Metrics system initialized with push gateway support");
    } else {
        info!("Metrics system initialized (no push gateway)");
    }

    Ok(())
}

/// Get access to the rendered metrics for debugging
#[allow(dead_code)]
pub fn get_metrics_handle() -> Option<String> {
    METRICS_HANDLE.get().map(|state| state.handle.render())
}

/// Internal function to push a single metric immediately
async fn push_single_metric(
    name: &str,
    value: f64,
    metric_type: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(state) = METRICS_HANDLE.get() {
        let push_url = format!(
            "{}/metrics/job/{}/instance/{}",
            state.pushgateway_url.trim_end_matches('/'),
            state.job,
            state.instance
        );

        let metrics_text = format!("# TYPE {} {}\n{} {}\n", name, metric_type, name, value);

        let client = reqwest::Client::new();
        let _ = client
            .post(&push_url)
            .header("Content-Type", "text/plain; version=0.0.4")
            .body(metrics_text)
            .send()
            .await?;
    }
    Ok(())
}

fn counter_and_push(name: &'static str, value: u64) {
    ::metrics::counter!(name).increment(value);
    tokio::spawn(async move {
        let _ = push_single_metric(name, value as f64, "counter").await;
    });
}

// ============================================================================
// Ingest Metrics
// ============================================================================

pub mod ingest {
    use super::{counter_and_push, MetricName};

    /// Record an upload arriving at the pipeline entry
    pub fn upload_received(bytes: usize) {
        counter_and_push(MetricName::IngestUploadsReceived.as_str(), 1);
        ::metrics::histogram!(MetricName::IngestUploadBytes.as_str()).record(bytes as f64);
    }

    /// Record an upload short-circuited by the dedup guard
    pub fn upload_deduplicated() {
        counter_and_push(MetricName::IngestUploadsDeduplicated.as_str(), 1);
    }

    /// Record normalization results for one batch
    pub fn rows_normalized(kept: usize, dropped: usize) {
        counter_and_push(MetricName::IngestRowsNormalized.as_str(), kept as u64);
        if dropped > 0 {
            counter_and_push(MetricName::IngestRowsDropped.as_str(), dropped as u64);
        }
    }

    /// Record facts persisted for one upload
    pub fn rows_inserted(count: usize) {
        counter_and_push(MetricName::IngestRowsInserted.as_str(), count as u64);
    }
}

// ============================================================================
// Forecast Metrics
// ============================================================================

pub mod forecast {
    use super::{counter_and_push, MetricName};

    /// Record a completed forecast
    pub fn produced(items: usize, horizon: u32) {
        counter_and_push(MetricName::ForecastsProduced.as_str(), 1);
        ::metrics::histogram!(MetricName::ForecastItems.as_str()).record(items as f64);
        ::metrics::histogram!(MetricName::ForecastHorizon.as_str()).record(horizon as f64);
    }

    /// Record a forecast run saved to the store
    pub fn run_saved() {
        counter_and_push(MetricName::ForecastRunsSaved.as_str(), 1);
    }
}
