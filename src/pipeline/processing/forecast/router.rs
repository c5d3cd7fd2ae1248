//! History-span model routing.
//!
//! Short histories stay on the local baseline; once any item's daily
//! history spans the threshold and a remote predictor is configured, the
//! whole request routes to the remote seasonal model.

use async_trait::async_trait;

use crate::domain::{ForecastResponse, Granularity};
use crate::error::Result;
use crate::pipeline::processing::aggregate::max_history_span_days;
use crate::pipeline::processing::forecast::strategies::RemotePredictor;
use crate::pipeline::processing::forecast::{ForecastRequest, ForecastStrategy};

const REMOTE_HISTORY_THRESHOLD_DAYS: i64 = 28;

pub struct ModelRouter {
    local: Box<dyn ForecastStrategy>,
    remote: Option<RemotePredictor>,
}

impl ModelRouter {
    pub fn new(local: Box<dyn ForecastStrategy>, remote: Option<RemotePredictor>) -> Self {
        Self { local, remote }
    }

    fn should_use_remote(&self, request: &ForecastRequest) -> bool {
        if self.remote.is_none() {
            return false;
        }
        // Hourly requests always go remote when a predictor is configured;
        // the local hourly baseline exists but spans are measured in days.
        if request.granularity == Granularity::Hourly {
            return true;
        }
        max_history_span_days(&request.items) >= REMOTE_HISTORY_THRESHOLD_DAYS
    }
}

#[async_trait]
impl ForecastStrategy for ModelRouter {
    async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        match &self.remote {
            Some(remote) if self.should_use_remote(request) => {
                tracing::info!(
                    span_days = max_history_span_days(&request.items),
                    "routing forecast to remote predictor"
                );
                remote.forecast(request).await
            }
            _ => self.local.forecast(request).await,
        }
    }
}
