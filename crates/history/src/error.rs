//! History facade error types.

use common::SchemaVersion;
use event_store::StoreError;
use thiserror::Error;

/// Errors that can occur in the history facade.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// An error occurred in the underlying store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A data migration callback failed. The failure was recorded as a
    /// `data_migration_failed` event before this was raised; no rollback
    /// is attempted beyond the pre-migration snapshot already taken.
    #[error("migration {from} -> {to} failed: {source}")]
    Migration {
        from: SchemaVersion,
        to: SchemaVersion,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for history facade operations.
pub type Result<T> = std::result::Result<T, HistoryError>;
