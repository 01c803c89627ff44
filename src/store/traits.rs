//! `DeliveryStore` trait — narrow async interface over the delivery log.

use async_trait::async_trait;

use crate::error::StoreError;

/// One durably persisted relay. Append-only: records are never updated or
/// deleted by this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRecord {
    pub text: String,
    pub chat_id: i64,
    /// Message timestamp. NOT unique — the API's time resolution is coarser
    /// than message granularity. Recovery keys off `MAX(ts)`, not rows.
    pub ts: i64,
}

/// Durable persistence of delivery records and the watermark they imply.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Maximum `ts` across all delivery records, or 0 for an empty store.
    /// Called once at startup to seed the in-memory watermark.
    async fn initial_watermark(&self) -> Result<i64, StoreError>;

    /// Durably persist one record. Must be committed before returning, so a
    /// crash immediately after sees it in `initial_watermark`.
    async fn append(&self, record: &DeliveryRecord) -> Result<(), StoreError>;

    /// Most recent records in insertion order, newest last. Audit-log read;
    /// the relay loop itself never calls this.
    async fn recent(&self, limit: usize) -> Result<Vec<DeliveryRecord>, StoreError>;
}
