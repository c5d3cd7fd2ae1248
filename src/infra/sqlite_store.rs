//! Local SQLite adapter for uploads, sales facts and forecast runs.
//!
//! The dedupe guarantee lives in the unique `(owner, file_hash)` index:
//! `record_upload` is atomic, so a concurrent duplicate resolves to
//! `AlreadyIngested` instead of a second row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

use crate::app::ports::{FactStore, RunStore, UploadOutcome};
use crate::domain::{ForecastRun, Observation};
use crate::error::{PipelineError, Result};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open_at_root<P: AsRef<Path>>(data_root: P) -> Result<Self> {
        let db_path = data_root.as_ref().join("demandcast.db");
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS uploads (
                id         TEXT PRIMARY KEY,
                owner      TEXT NOT NULL,
                file_hash  TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_uploads_owner_hash
                ON uploads(owner, file_hash);
            CREATE TABLE IF NOT EXISTS sales_facts (
                owner     TEXT NOT NULL,
                upload_id TEXT NOT NULL,
                ts        TEXT NOT NULL,
                item      TEXT NOT NULL,
                quantity  REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sales_facts_owner ON sales_facts(owner);
            CREATE TABLE IF NOT EXISTS forecast_runs (
                id            TEXT PRIMARY KEY,
                owner         TEXT NOT NULL,
                mapping_json  TEXT,
                forecast_json TEXT NOT NULL,
                created_at    TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| PipelineError::Storage(format!("bad timestamp '{raw}' in store: {e}")))
    }

    fn parse_id(raw: &str) -> Result<Uuid> {
        Uuid::parse_str(raw)
            .map_err(|e| PipelineError::Storage(format!("bad id '{raw}' in store: {e}")))
    }
}

#[async_trait]
impl FactStore for SqliteStore {
    async fn find_upload(&self, owner: &str, fingerprint: &str) -> Result<Option<Uuid>> {
        let conn = self.conn.lock().unwrap();
        let id: Option<String> = conn
            .query_row(
                "SELECT id FROM uploads WHERE owner = ?1 AND file_hash = ?2",
                params![owner, fingerprint],
                |row| row.get(0),
            )
            .optional()?;
        id.as_deref().map(Self::parse_id).transpose()
    }

    async fn record_upload(&self, owner: &str, fingerprint: &str) -> Result<UploadOutcome> {
        let conn = self.conn.lock().unwrap();
        let id = Uuid::new_v4();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO uploads (id, owner, file_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id.to_string(), owner, fingerprint, Utc::now().to_rfc3339()],
        )?;
        if inserted == 1 {
            return Ok(UploadOutcome::Recorded(id));
        }
        let existing: String = conn.query_row(
            "SELECT id FROM uploads WHERE owner = ?1 AND file_hash = ?2",
            params![owner, fingerprint],
            |row| row.get(0),
        )?;
        Ok(UploadOutcome::AlreadyIngested(Self::parse_id(&existing)?))
    }

    async fn append_observations(
        &self,
        owner: &str,
        upload_id: Uuid,
        observations: &[Observation],
    ) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO sales_facts (owner, upload_id, ts, item, quantity)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for obs in observations {
                stmt.execute(params![
                    owner,
                    upload_id.to_string(),
                    obs.ts.to_rfc3339(),
                    obs.item,
                    obs.quantity,
                ])?;
            }
        }
        tx.commit()?;
        Ok(observations.len())
    }

    async fn load_observations(&self, owner: &str) -> Result<Vec<Observation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT ts, item, quantity FROM sales_facts WHERE owner = ?1")?;
        let rows = stmt.query_map(params![owner], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;

        let mut observations = Vec::new();
        for row in rows {
            let (ts, item, quantity) = row?;
            observations.push(Observation {
                ts: Self::parse_ts(&ts)?,
                item,
                quantity,
            });
        }
        Ok(observations)
    }
}

#[async_trait]
impl RunStore for SqliteStore {
    async fn save_run(&self, owner: &str, run: &ForecastRun) -> Result<()> {
        let mapping_json = run
            .mapping
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO forecast_runs (id, owner, mapping_json, forecast_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run.id.to_string(),
                owner,
                mapping_json,
                serde_json::to_string(&run.result)?,
                run.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn latest_run(&self, owner: &str) -> Result<Option<ForecastRun>> {
        let conn = self.conn.lock().unwrap();
        let row: Option<(String, Option<String>, String, String)> = conn
            .query_row(
                "SELECT id, mapping_json, forecast_json, created_at
                 FROM forecast_runs WHERE owner = ?1
                 ORDER BY created_at DESC LIMIT 1",
                params![owner],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, mapping_json, forecast_json, created_at)| {
            Ok(ForecastRun {
                id: Self::parse_id(&id)?,
                mapping: mapping_json
                    .as_deref()
                    .map(serde_json::from_str)
                    .transpose()?,
                result: serde_json::from_str(&forecast_json)?,
                created_at: Self::parse_ts(&created_at)?,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ColumnMapping;
    use tempfile::tempdir;

    fn obs(ts: &str, item: &str, quantity: f64) -> Observation {
        Observation {
            ts: ts.parse().unwrap(),
            item: item.to_string(),
            quantity,
        }
    }

    #[tokio::test]
    async fn upload_fingerprints_dedupe_per_owner() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at_root(dir.path()).unwrap();

        let first = store.record_upload("acme", "abc123").await.unwrap();
        let id = match first {
            UploadOutcome::Recorded(id) => id,
            other => panic!("unexpected: {other:?}"),
        };
        assert_eq!(
            store.record_upload("acme", "abc123").await.unwrap(),
            UploadOutcome::AlreadyIngested(id)
        );
        // A different owner is free to ingest the same bytes.
        assert!(matches!(
            store.record_upload("globex", "abc123").await.unwrap(),
            UploadOutcome::Recorded(_)
        ));
        assert_eq!(store.find_upload("acme", "abc123").await.unwrap(), Some(id));
        assert_eq!(store.find_upload("acme", "other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn facts_round_trip() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at_root(dir.path()).unwrap();

        let upload = match store.record_upload("acme", "fp").await.unwrap() {
            UploadOutcome::Recorded(id) => id,
            other => panic!("unexpected: {other:?}"),
        };
        let observations = vec![
            obs("2024-01-01T00:00:00Z", "Widget", 3.0),
            obs("2024-01-02T00:00:00Z", "Widget", 5.0),
        ];
        let inserted = store
            .append_observations("acme", upload, &observations)
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let loaded = store.load_observations("acme").await.unwrap();
        assert_eq!(loaded, observations);
        assert!(store.load_observations("globex").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn latest_run_returns_the_most_recent() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at_root(dir.path()).unwrap();

        assert!(store.latest_run("acme").await.unwrap().is_none());

        let mapping = ColumnMapping::new("Date", "Item", "Quantity");
        let mut first = ForecastRun::new(Some(mapping), serde_json::json!({"mode": "per_product"}));
        first.created_at = "2024-01-01T00:00:00Z".parse().unwrap();
        let mut second = ForecastRun::new(None, serde_json::json!({"mode": "per_product"}));
        second.created_at = "2024-02-01T00:00:00Z".parse().unwrap();

        store.save_run("acme", &first).await.unwrap();
        store.save_run("acme", &second).await.unwrap();

        let latest = store.latest_run("acme").await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert!(latest.mapping.is_none());
    }
}
