use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use shopdash_core::model::StoredDocument;

use crate::schema::init_sql;

/// Timestamp layout bound into `created_at` parameters and comparisons.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub(crate) fn sql_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// DuckDB-backed document store for the dashboard collections.
///
/// DuckDB is single-writer, so the connection sits behind
/// `Arc<Mutex<_>>`; the struct is cheap to share across Axum handlers and
/// every query takes the lock for its full duration.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) a DuckDB database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        info!(
            "DuckDB opened at {} with memory_limit={}, threads=2",
            path, memory_limit
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an **in-memory** DuckDB database. Data is discarded on drop.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Insert or replace a batch of documents in a single transaction.
    ///
    /// Returns immediately (no-op) if `docs` is empty.
    pub async fn insert<T: StoredDocument>(&self, docs: &[T]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }

        let table = T::COLLECTION.as_str();
        let sql = format!("INSERT OR REPLACE INTO {table} (id, created_at, doc) VALUES (?1, ?2, ?3)");

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for doc in docs {
            let body = serde_json::to_string(doc)?;
            tx.execute(
                &sql,
                duckdb::params![doc.id(), sql_timestamp(&doc.created_at()), body],
            )?;
        }
        tx.commit()?;

        tracing::info!(collection = table, count = docs.len(), "Inserted documents");
        Ok(())
    }
}
