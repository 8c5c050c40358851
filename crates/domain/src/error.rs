//! Domain error types.

use history::HistoryError;
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The requested entity does not exist.
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: i64 },

    /// The current-state file could not be read.
    #[error("state read failed: {0}")]
    StateRead(#[source] std::io::Error),

    /// The current-state file could not be written. The mutation is
    /// considered not applied.
    #[error("state write failed: {0}")]
    StateWrite(#[source] std::io::Error),

    /// An error occurred while recording the audit event.
    #[error("history error: {0}")]
    History(#[from] HistoryError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
