//! Client for the external seasonal predictor service.
//!
//! The service owns its model internals; this strategy only speaks the
//! fixed wire contract: `{ horizon_days, timezone?, items }` in,
//! `{ results: { item: { forecast: [...] } } }` out. Per-item meta is
//! filled in client-side with the remote model name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{ForecastMeta, ForecastPoint, ForecastResponse, Granularity, ItemForecast};
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::forecast::{ForecastRequest, ForecastStrategy};

pub struct RemotePredictor {
    client: reqwest::Client,
    url: String,
    timezone: Option<String>,
}

#[derive(Serialize)]
struct RemoteRequestBody<'a> {
    horizon_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    timezone: Option<&'a str>,
    items: BTreeMap<&'a str, Vec<RemoteSeriesPoint>>,
}

#[derive(Serialize)]
struct RemoteSeriesPoint {
    ds: String,
    y: f64,
}

#[derive(Deserialize)]
struct RemoteResponseBody {
    #[serde(default)]
    results: BTreeMap<String, RemoteItemResult>,
}

#[derive(Deserialize)]
struct RemoteItemResult {
    #[serde(default)]
    forecast: Vec<ForecastPoint>,
}

impl RemotePredictor {
    pub fn new(url: impl Into<String>, timezone: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timezone,
        }
    }

    fn model_name(granularity: Granularity) -> &'static str {
        match granularity {
            Granularity::Daily => "prophet_v1",
            Granularity::Hourly => "prophet_hourly_v1",
        }
    }
}

#[async_trait]
impl ForecastStrategy for RemotePredictor {
    async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        let items: BTreeMap<&str, Vec<RemoteSeriesPoint>> = request
            .items
            .iter()
            .map(|(item, series)| {
                let points = series
                    .iter()
                    .map(|p| RemoteSeriesPoint {
                        ds: request.granularity.format_ds(p.ts),
                        y: p.y,
                    })
                    .collect();
                (item.as_str(), points)
            })
            .collect();

        let body = RemoteRequestBody {
            horizon_days: request.horizon,
            timezone: self.timezone.as_deref(),
            items,
        };

        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Predictor(format!(
                "predictor service returned {status}: {text}"
            )));
        }
        let parsed: RemoteResponseBody = response.json().await?;

        let model = Self::model_name(request.granularity);
        let results = parsed
            .results
            .into_iter()
            .map(|(item, result)| {
                (
                    item,
                    ItemForecast {
                        meta: ForecastMeta {
                            model: model.to_string(),
                            regressors: Vec::new(),
                        },
                        forecast: result.forecast,
                    },
                )
            })
            .collect();

        Ok(ForecastResponse {
            mode: request.granularity.mode().to_string(),
            results,
        })
    }
}
