//! Error types for sentra-core

use thiserror::Error;

/// Result type alias using sentra-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sentra-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Credential missing or rejected; the cause is never distinguished
    #[error("Unauthorized")]
    Unauthorized,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
