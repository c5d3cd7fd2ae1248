//! Dedup-guarded ingest: fingerprint the upload, normalize it, persist the
//! usable observations.

use std::sync::Arc;
use tracing::info;

use crate::app::ports::{FactStore, UploadOutcome};
use crate::domain::{ColumnMapping, DropCounts, Granularity, IngestSummary};
use crate::error::{PipelineError, Result};
use crate::observability::metrics;
use crate::pipeline::ingestion::{fingerprint::fingerprint, mapping::resolve_mapping, reader};
use crate::pipeline::processing::normalize::normalize_batch;

pub struct IngestUseCase {
    store: Arc<dyn FactStore>,
}

impl IngestUseCase {
    pub fn new(store: Arc<dyn FactStore>) -> Self {
        Self { store }
    }

    /// Ingests one upload for an owner.
    ///
    /// A byte-identical re-submission short-circuits before any parsing and
    /// reports zero inserted rows. Validation and normalization run before
    /// the upload is recorded, so a malformed or unusable file records
    /// nothing and a later corrected upload is not shadowed by the dedupe
    /// index.
    pub async fn ingest(
        &self,
        owner: &str,
        raw: &[u8],
        mapping: &ColumnMapping,
        granularity: Granularity,
    ) -> Result<IngestSummary> {
        if raw.is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let file_hash = fingerprint(raw);
        metrics::ingest::upload_received(raw.len());

        if let Some(upload_id) = self.store.find_upload(owner, &file_hash).await? {
            info!(owner, %upload_id, "upload already ingested, skipping");
            metrics::ingest::upload_deduplicated();
            return Ok(Self::already_ingested(owner, file_hash, None));
        }

        let table = reader::read_table(raw)?;
        let resolved = resolve_mapping(mapping, &table.headers)?;
        let (observations, dropped) = normalize_batch(&table.records, &resolved, granularity);
        let rows_read = table.records.len();
        metrics::ingest::rows_normalized(observations.len(), dropped.total());

        if observations.is_empty() {
            return Err(PipelineError::NoUsableData);
        }

        let upload_id = match self.store.record_upload(owner, &file_hash).await? {
            UploadOutcome::Recorded(id) => id,
            UploadOutcome::AlreadyIngested(_) => {
                // Lost a race with an identical concurrent upload.
                metrics::ingest::upload_deduplicated();
                return Ok(Self::already_ingested(owner, file_hash, Some(rows_read)));
            }
        };

        let rows_inserted = self
            .store
            .append_observations(owner, upload_id, &observations)
            .await?;
        metrics::ingest::rows_inserted(rows_inserted);
        info!(owner, %upload_id, rows_read, rows_inserted, "ingest completed");

        Ok(IngestSummary {
            ok: true,
            owner: owner.to_string(),
            upload_id: Some(upload_id),
            fingerprint: file_hash,
            rows_read,
            rows_inserted,
            rows_dropped: dropped,
            message: "Ingested successfully.".to_string(),
        })
    }

    fn already_ingested(owner: &str, fingerprint: String, rows_read: Option<usize>) -> IngestSummary {
        IngestSummary {
            ok: true,
            owner: owner.to_string(),
            upload_id: None,
            fingerprint,
            rows_read: rows_read.unwrap_or(0),
            rows_inserted: 0,
            rows_dropped: DropCounts::default(),
            message: "File already ingested (deduped by file hash).".to_string(),
        }
    }
}
