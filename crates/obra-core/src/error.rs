//! Error types for obra-core

use thiserror::Error;

/// Result type alias using obra-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in obra-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found in its collection
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The live subscription to a collection failed
    #[error("Subscription error: {0}")]
    Subscription(String),
}
