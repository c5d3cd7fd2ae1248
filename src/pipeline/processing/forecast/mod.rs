//! Forecasting strategies behind one capability interface.
//!
//! Every predictor — the local baselines and the remote seasonal service —
//! implements [`ForecastStrategy`], so callers swap models by configuration
//! instead of branching.

pub mod router;
pub mod strategies;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::{ForecastPoint, ForecastResponse, Granularity, ItemSeriesMap};
use crate::error::Result;

/// One forecast request: the aggregated per-item history plus how far to
/// project and at which resolution.
#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub horizon: u32,
    pub granularity: Granularity,
    pub items: ItemSeriesMap,
}

/// The pluggable predictor seam. Strategies take the whole per-item map
/// because the remote service is inherently batched.
#[async_trait]
pub trait ForecastStrategy: Send + Sync {
    async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse>;
}

/// Rounds to 4 decimal digits, half away from zero.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// The fixed-ratio band around a point estimate.
///
/// This is a heuristic placeholder, not a statistical confidence interval:
/// the width never narrows with more data. It lives behind a named policy
/// so a real interval can replace it without touching the strategies.
#[derive(Debug, Clone, Copy)]
pub struct FixedRatioBounds {
    pub lower_ratio: f64,
    pub upper_ratio: f64,
}

impl Default for FixedRatioBounds {
    fn default() -> Self {
        Self {
            lower_ratio: 0.8,
            upper_ratio: 1.2,
        }
    }
}

impl FixedRatioBounds {
    /// Builds one forecast point. Bounds derive from the unrounded
    /// estimate; all three values round independently.
    pub fn point(&self, ds: String, yhat: f64) -> ForecastPoint {
        ForecastPoint {
            ds,
            yhat: round4(yhat),
            yhat_lower: round4(yhat * self.lower_ratio),
            yhat_upper: round4(yhat * self.upper_ratio),
        }
    }
}

/// Contiguous future buckets after the last observed one: days in daily
/// mode, hours in hourly mode.
pub fn future_buckets(
    last_observed: DateTime<Utc>,
    horizon: u32,
    granularity: Granularity,
) -> Vec<DateTime<Utc>> {
    let step = match granularity {
        Granularity::Daily => Duration::days(1),
        Granularity::Hourly => Duration::hours(1),
    };
    (1..=horizon as i64)
        .map(|i| last_observed + step * i as i32)
        .collect()
}
