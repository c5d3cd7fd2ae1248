//! Constant mean-of-recent-observations baseline, the default predictor.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::{ForecastMeta, ForecastResponse, Granularity, ItemForecast, SeriesPoint};
use crate::error::Result;
use crate::pipeline::processing::forecast::{
    future_buckets, FixedRatioBounds, ForecastRequest, ForecastStrategy,
};

/// Projects the arithmetic mean of the last `window` observations flat
/// across the horizon. No weekday or trend variation.
pub struct BaselineMean {
    window: usize,
    bounds: FixedRatioBounds,
}

impl BaselineMean {
    pub fn new() -> Self {
        Self {
            window: 7,
            bounds: FixedRatioBounds::default(),
        }
    }

    fn model_name(granularity: Granularity) -> &'static str {
        match granularity {
            Granularity::Daily => "baseline_mean_last_7",
            Granularity::Hourly => "baseline_mean_last_7_hourly",
        }
    }

    /// Mean of the trailing `min(window, len)` values of an ascending
    /// series. A single observation yields itself.
    fn recent_mean(&self, series: &[SeriesPoint]) -> f64 {
        let tail = &series[series.len().saturating_sub(self.window)..];
        let sum: f64 = tail.iter().map(|p| p.y).sum();
        sum / tail.len().max(1) as f64
    }
}

impl Default for BaselineMean {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ForecastStrategy for BaselineMean {
    async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        let mut results = BTreeMap::new();

        for (item, series) in &request.items {
            if series.is_empty() {
                continue;
            }
            let mean = self.recent_mean(series);
            let last = series.last().unwrap().ts;

            let forecast = future_buckets(last, request.horizon, request.granularity)
                .into_iter()
                .map(|ts| self.bounds.point(request.granularity.format_ds(ts), mean))
                .collect();

            results.insert(
                item.clone(),
                ItemForecast {
                    meta: ForecastMeta {
                        model: Self::model_name(request.granularity).to_string(),
                        regressors: Vec::new(),
                    },
                    forecast,
                },
            );
        }

        Ok(ForecastResponse {
            mode: request.granularity.mode().to_string(),
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn series(days_and_values: &[(u32, f64)]) -> Vec<SeriesPoint> {
        days_and_values
            .iter()
            .map(|&(day, y)| SeriesPoint {
                ts: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
                y,
            })
            .collect()
    }

    fn request(points: Vec<SeriesPoint>, horizon: u32) -> ForecastRequest {
        let mut items = BTreeMap::new();
        items.insert("A".to_string(), points);
        ForecastRequest {
            horizon,
            granularity: Granularity::Daily,
            items,
        }
    }

    #[tokio::test]
    async fn three_day_example_projects_the_mean() {
        let req = request(series(&[(1, 10.0), (2, 20.0), (3, 30.0)]), 2);
        let response = BaselineMean::new().forecast(&req).await.unwrap();

        assert_eq!(response.mode, "per_product");
        let item = &response.results["A"];
        assert_eq!(item.meta.model, "baseline_mean_last_7");

        let points = &item.forecast;
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].ds, "2024-01-04");
        assert_eq!(points[1].ds, "2024-01-05");
        for p in points {
            assert_eq!(p.yhat, 20.0);
            assert_eq!(p.yhat_lower, 16.0);
            assert_eq!(p.yhat_upper, 24.0);
        }
    }

    #[tokio::test]
    async fn mean_uses_only_the_last_seven_observations() {
        let points = series(&[
            (1, 100.0),
            (2, 7.0),
            (3, 7.0),
            (4, 7.0),
            (5, 7.0),
            (6, 7.0),
            (7, 7.0),
            (8, 7.0),
        ]);
        let response = BaselineMean::new().forecast(&request(points, 1)).await.unwrap();
        assert_eq!(response.results["A"].forecast[0].yhat, 7.0);
    }

    #[tokio::test]
    async fn single_observation_still_forecasts_flat() {
        let response = BaselineMean::new()
            .forecast(&request(series(&[(15, 4.0)]), 3))
            .await
            .unwrap();
        let forecast = &response.results["A"].forecast;
        assert_eq!(forecast.len(), 3);
        assert_eq!(forecast[0].ds, "2024-01-16");
        assert!(forecast.iter().all(|p| p.yhat == 4.0));
    }

    #[tokio::test]
    async fn hourly_mode_steps_hourly_with_rfc3339_buckets() {
        let mut items = BTreeMap::new();
        items.insert(
            "A".to_string(),
            vec![SeriesPoint {
                ts: Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap(),
                y: 5.0,
            }],
        );
        let req = ForecastRequest {
            horizon: 3,
            granularity: Granularity::Hourly,
            items,
        };
        let response = BaselineMean::new().forecast(&req).await.unwrap();

        assert_eq!(response.mode, "per_product_hourly");
        let item = &response.results["A"];
        assert_eq!(item.meta.model, "baseline_mean_last_7_hourly");
        assert_eq!(item.forecast[0].ds, "2024-01-01T23:00:00+00:00");
        assert_eq!(item.forecast[2].ds, "2024-01-02T01:00:00+00:00");
    }
}
