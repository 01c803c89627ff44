//! Persistence layer — libSQL-backed delivery log and watermark recovery.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use traits::{DeliveryRecord, DeliveryStore};
