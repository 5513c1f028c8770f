//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, ComicsError>;

/// Errors raised by the shared table model
#[derive(Error, Debug)]
pub enum ComicsError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Row has {actual} cells but the table has {expected} columns")]
    RowWidth { expected: usize, actual: usize },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}
