//! In-memory store for tests and store-less runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::app::ports::{FactStore, RunStore, UploadOutcome};
use crate::domain::{ForecastRun, Observation};
use crate::error::Result;

#[derive(Default)]
pub struct InMemoryStore {
    // (owner, fingerprint) -> upload id
    uploads: Arc<Mutex<HashMap<(String, String), Uuid>>>,
    // owner -> facts
    facts: Arc<Mutex<HashMap<String, Vec<Observation>>>>,
    // owner -> runs, oldest first
    runs: Arc<Mutex<HashMap<String, Vec<ForecastRun>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FactStore for InMemoryStore {
    async fn find_upload(&self, owner: &str, fingerprint: &str) -> Result<Option<Uuid>> {
        let uploads = self.uploads.lock().unwrap();
        Ok(uploads.get(&(owner.to_string(), fingerprint.to_string())).copied())
    }

    async fn record_upload(&self, owner: &str, fingerprint: &str) -> Result<UploadOutcome> {
        let mut uploads = self.uploads.lock().unwrap();
        let key = (owner.to_string(), fingerprint.to_string());
        if let Some(existing) = uploads.get(&key) {
            return Ok(UploadOutcome::AlreadyIngested(*existing));
        }
        let id = Uuid::new_v4();
        uploads.insert(key, id);
        Ok(UploadOutcome::Recorded(id))
    }

    async fn append_observations(
        &self,
        owner: &str,
        _upload_id: Uuid,
        observations: &[Observation],
    ) -> Result<usize> {
        let mut facts = self.facts.lock().unwrap();
        facts
            .entry(owner.to_string())
            .or_default()
            .extend_from_slice(observations);
        Ok(observations.len())
    }

    async fn load_observations(&self, owner: &str) -> Result<Vec<Observation>> {
        let facts = self.facts.lock().unwrap();
        Ok(facts.get(owner).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl RunStore for InMemoryStore {
    async fn save_run(&self, owner: &str, run: &ForecastRun) -> Result<()> {
        let mut runs = self.runs.lock().unwrap();
        runs.entry(owner.to_string()).or_default().push(run.clone());
        Ok(())
    }

    async fn latest_run(&self, owner: &str) -> Result<Option<ForecastRun>> {
        let runs = self.runs.lock().unwrap();
        Ok(runs.get(owner).and_then(|r| r.last().cloned()))
    }
}
