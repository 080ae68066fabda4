//! libSQL process store: survives restarts and can be shared by several
//! service instances pointing at the same database.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use super::migrations;
use super::traits::{ProcessStore, is_expired};
use crate::error::StoreError;
use crate::pipeline::types::{ProcessRecord, ResultSet};

/// libSQL-backed [`ProcessStore`].
///
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use,
/// so a single connection is shared by all operations.
pub struct LibSqlProcessStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    ttl: Option<Duration>,
}

impl LibSqlProcessStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Open(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Process store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create in-memory database: {e}")))?;
        Self::from_database(db).await
    }

    /// Treat records older than `ttl` as expired on read.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, StoreError> {
        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            ttl: None,
        })
    }
}

/// Fixed-width RFC 3339 so timestamps compare correctly as text.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("bad created_at '{s}': {e}")))
}

fn row_to_record(id: Uuid, row: &libsql::Row) -> Result<ProcessRecord, StoreError> {
    let document: Vec<u8> = row
        .get(0)
        .map_err(|e| StoreError::Query(format!("document column: {e}")))?;
    let results: String = row
        .get(1)
        .map_err(|e| StoreError::Query(format!("results column: {e}")))?;
    let created: String = row
        .get(2)
        .map_err(|e| StoreError::Query(format!("created_at column: {e}")))?;

    let result_set: ResultSet = serde_json::from_str(&results)
        .map_err(|e| StoreError::Serialization(format!("results JSON: {e}")))?;

    Ok(ProcessRecord {
        correlation_id: id,
        source_document: document,
        result_set,
        created_at: parse_timestamp(&created)?,
    })
}

#[async_trait]
impl ProcessStore for LibSqlProcessStore {
    async fn create(&self, document: Vec<u8>, result_set: ResultSet) -> Result<Uuid, StoreError> {
        let results = serde_json::to_string(&result_set)
            .map_err(|e| StoreError::Serialization(format!("results JSON: {e}")))?;
        let created_at = format_timestamp(Utc::now());

        // The primary key rejects a colliding id; retry with a fresh one.
        let mut attempts = 0;
        loop {
            let id = Uuid::new_v4();
            let inserted = self
                .conn
                .execute(
                    "INSERT OR IGNORE INTO processes (id, document, results, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![id.to_string(), document.clone(), results.clone(), created_at.clone()],
                )
                .await
                .map_err(|e| StoreError::Query(format!("create: {e}")))?;

            if inserted == 1 {
                debug!(process_id = %id, "Process record created");
                return Ok(id);
            }
            attempts += 1;
            if attempts >= 3 {
                return Err(StoreError::Query("create: could not allocate a unique id".into()));
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<ProcessRecord, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT document, results, created_at FROM processes WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("get: {e}")))?
            .ok_or(StoreError::NotFound { id })?;

        let record = row_to_record(id, &row)?;
        if is_expired(record.created_at, self.ttl, Utc::now()) {
            return Err(StoreError::NotFound { id });
        }
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM processes WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(|e| StoreError::Query(format!("delete: {e}")))?;
        if removed > 0 {
            debug!(process_id = %id, "Process record deleted");
        }
        Ok(())
    }

    async fn purge_expired(&self, ttl: Duration) -> Result<usize, StoreError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StoreError::Query(format!("purge: ttl out of range: {e}")))?;
        let cutoff = format_timestamp(Utc::now() - ttl);
        let purged = self
            .conn
            .execute("DELETE FROM processes WHERE created_at < ?1", params![cutoff])
            .await
            .map_err(|e| StoreError::Query(format!("purge: {e}")))?;
        if purged > 0 {
            info!(count = purged, "Expired process records purged");
        }
        Ok(purged as usize)
    }
}
