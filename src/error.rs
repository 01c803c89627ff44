//! Error types for the repeater.

/// Top-level error type for the relay process.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration-related errors. All of these are startup-fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Delivery-store errors.
///
/// Any of these observed inside the relay loop is fatal to the process:
/// a delivery record that failed to persist would let the watermark
/// advance past an unrecorded message after a crash.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Transport write errors. Fetch failures never surface as errors — they
/// degrade to an empty batch — so this only covers `sendMessage`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("sendMessage request failed: {0}")]
    Request(String),

    #[error("sendMessage returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Result type alias for the relay process.
pub type Result<T> = std::result::Result<T, Error>;
