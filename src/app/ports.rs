//! Persistence ports consumed by the use cases. The pipeline itself never
//! touches storage; adapters in `infra` implement these.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{ForecastRun, Observation};
use crate::error::Result;

/// Outcome of recording an upload fingerprint for an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Recorded(Uuid),
    /// The `(owner, fingerprint)` pair already existed; the id is the
    /// original upload's. A successful zero-work outcome, not an error.
    AlreadyIngested(Uuid),
}

/// Uploads and sales facts, keyed by owner.
#[async_trait]
pub trait FactStore: Send + Sync {
    async fn find_upload(&self, owner: &str, fingerprint: &str) -> Result<Option<Uuid>>;

    /// Records an upload fingerprint atomically: a concurrent duplicate
    /// resolves to `AlreadyIngested` rather than a second row.
    async fn record_upload(&self, owner: &str, fingerprint: &str) -> Result<UploadOutcome>;

    async fn append_observations(
        &self,
        owner: &str,
        upload_id: Uuid,
        observations: &[Observation],
    ) -> Result<usize>;

    async fn load_observations(&self, owner: &str) -> Result<Vec<Observation>>;
}

/// Persisted forecast runs, keyed by owner.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn save_run(&self, owner: &str, run: &ForecastRun) -> Result<()>;
    async fn latest_run(&self, owner: &str) -> Result<Option<ForecastRun>>;
}
