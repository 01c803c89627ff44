//! libSQL backend — async `DeliveryStore` over a local database file.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::migrations;
use crate::store::traits::{DeliveryRecord, DeliveryStore};

/// libSQL delivery-log backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use;
/// the relay loop is the only writer.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Open(format!("Failed to create store directory: {e}")))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&store.conn).await?;
        info!(path = %path.display(), "Delivery store opened");
        Ok(store)
    }

    /// Create an in-memory store (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&store.conn).await?;
        Ok(store)
    }
}

#[async_trait]
impl DeliveryStore for LibSqlStore {
    async fn initial_watermark(&self) -> Result<i64, StoreError> {
        let mut rows = self
            .conn
            .query("SELECT COALESCE(MAX(ts), 0) FROM messages", ())
            .await
            .map_err(|e| StoreError::Query(format!("Failed to read watermark: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            Some(row) => row
                .get::<i64>(0)
                .map_err(|e| StoreError::Query(e.to_string())),
            None => Ok(0),
        }
    }

    async fn append(&self, record: &DeliveryRecord) -> Result<(), StoreError> {
        let started = Instant::now();

        self.conn
            .execute(
                "INSERT INTO messages (message, chat_id, ts) VALUES (?1, ?2, ?3)",
                params![record.text.as_str(), record.chat_id, record.ts],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to append delivery record: {e}")))?;

        debug!(
            ts = record.ts,
            chat_id = record.chat_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Delivery record appended"
        );
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<DeliveryRecord>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT message, chat_id, ts FROM (
                     SELECT rowid, message, chat_id, ts FROM messages
                     ORDER BY rowid DESC LIMIT ?1
                 ) ORDER BY rowid ASC",
                params![limit as i64],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to read recent deliveries: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            let text: Option<String> = row.get(0).ok();
            let chat_id: i64 = row.get(1).map_err(|e| StoreError::Query(e.to_string()))?;
            let ts: i64 = row.get(2).map_err(|e| StoreError::Query(e.to_string()))?;
            records.push(DeliveryRecord {
                text: text.unwrap_or_default(),
                chat_id,
                ts,
            });
        }
        Ok(records)
    }
}
