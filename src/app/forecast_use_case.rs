//! Forecast flows: one-shot CSV in / forecast out, and forecasting from
//! previously persisted facts with optional run saving.

use std::sync::Arc;
use tracing::info;

use crate::app::ports::{FactStore, RunStore};
use crate::domain::{ColumnMapping, ForecastResponse, ForecastRun, Granularity};
use crate::error::{PipelineError, Result};
use crate::observability::metrics;
use crate::pipeline::ingestion::{mapping::resolve_mapping, reader};
use crate::pipeline::processing::aggregate::group_series;
use crate::pipeline::processing::forecast::{ForecastRequest, ForecastStrategy};
use crate::pipeline::processing::normalize::normalize_batch;

pub struct ForecastUseCase {
    strategy: Arc<dyn ForecastStrategy>,
}

impl ForecastUseCase {
    pub fn new(strategy: Arc<dyn ForecastStrategy>) -> Self {
        Self { strategy }
    }

    /// One-shot flow: raw CSV bytes plus a mapping, nothing persisted.
    pub async fn forecast_csv(
        &self,
        raw: &[u8],
        mapping: &ColumnMapping,
        horizon: u32,
        granularity: Granularity,
    ) -> Result<ForecastResponse> {
        let table = reader::read_table(raw)?;
        let resolved = resolve_mapping(mapping, &table.headers)?;
        let (observations, dropped) = normalize_batch(&table.records, &resolved, granularity);
        metrics::ingest::rows_normalized(observations.len(), dropped.total());

        let items = group_series(&observations, true);
        if items.is_empty() {
            return Err(PipelineError::NoUsableData);
        }

        let request = ForecastRequest {
            horizon,
            granularity,
            items,
        };
        let response = self.strategy.forecast(&request).await?;
        metrics::forecast::produced(response.results.len(), horizon);
        info!(
            items = response.results.len(),
            horizon,
            rows_dropped = dropped.total(),
            "forecast produced from CSV"
        );
        Ok(response)
    }

    /// Forecasts from the facts previously ingested for an owner.
    pub async fn forecast_stored(
        &self,
        store: &dyn FactStore,
        owner: &str,
        horizon: u32,
        granularity: Granularity,
    ) -> Result<ForecastResponse> {
        let observations = store.load_observations(owner).await?;
        let items = group_series(&observations, true);
        if items.is_empty() {
            return Err(PipelineError::NoUsableData);
        }

        let request = ForecastRequest {
            horizon,
            granularity,
            items,
        };
        let response = self.strategy.forecast(&request).await?;
        metrics::forecast::produced(response.results.len(), horizon);
        info!(owner, items = response.results.len(), horizon, "forecast produced from store");
        Ok(response)
    }

    /// Persists a completed forecast as the owner's latest run.
    pub async fn save_run(
        &self,
        runs: &dyn RunStore,
        owner: &str,
        mapping: Option<ColumnMapping>,
        response: &ForecastResponse,
    ) -> Result<ForecastRun> {
        let run = ForecastRun::new(mapping, serde_json::to_value(response)?);
        runs.save_run(owner, &run).await?;
        metrics::forecast::run_saved();
        info!(owner, run_id = %run.id, "forecast run saved");
        Ok(run)
    }
}
