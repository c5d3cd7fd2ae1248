//! Per-weekday mean baseline: each future day is predicted from the mean
//! of historical observations that fell on the same weekday, with the
//! overall mean as fallback for weekdays never observed.

use async_trait::async_trait;
use chrono::Datelike;
use std::collections::BTreeMap;

use crate::domain::{ForecastMeta, ForecastResponse, ItemForecast, SeriesPoint};
use crate::error::Result;
use crate::pipeline::processing::forecast::{
    future_buckets, FixedRatioBounds, ForecastRequest, ForecastStrategy,
};

pub struct WeekdayMean {
    bounds: FixedRatioBounds,
}

impl WeekdayMean {
    pub fn new() -> Self {
        Self {
            bounds: FixedRatioBounds::default(),
        }
    }
}

impl Default for WeekdayMean {
    fn default() -> Self {
        Self::new()
    }
}

fn weekday_idx(point: &SeriesPoint) -> usize {
    point.ts.weekday().num_days_from_sunday() as usize
}

#[async_trait]
impl ForecastStrategy for WeekdayMean {
    async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        let mut results = BTreeMap::new();

        for (item, series) in &request.items {
            if series.is_empty() {
                continue;
            }

            let mut buckets: [Vec<f64>; 7] = Default::default();
            for point in series {
                buckets[weekday_idx(point)].push(point.y);
            }
            let overall: f64 =
                series.iter().map(|p| p.y).sum::<f64>() / series.len().max(1) as f64;

            let last = series.last().unwrap().ts;
            let forecast = future_buckets(last, request.horizon, request.granularity)
                .into_iter()
                .map(|ts| {
                    let bucket = &buckets[ts.weekday().num_days_from_sunday() as usize];
                    let mean = if bucket.is_empty() {
                        overall
                    } else {
                        bucket.iter().sum::<f64>() / bucket.len() as f64
                    };
                    self.bounds.point(request.granularity.format_ds(ts), mean)
                })
                .collect();

            results.insert(
                item.clone(),
                ItemForecast {
                    meta: ForecastMeta {
                        model: "baseline_weekday_mean".to_string(),
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
