use thiserror::Error;

/// Errors that can occur when interacting with the history store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be read.
    ///
    /// Read paths that can degrade (a missing or corrupt event log) do so
    /// inside the store implementations and never surface this; it is
    /// reserved for reads whose failure must not be papered over, such as
    /// loading the existing log before an append.
    #[error("store read failed: {0}")]
    Read(#[source] std::io::Error),

    /// A durable write could not complete. The operation is considered
    /// not applied; no partial-write state is exposed.
    #[error("store write failed: {0}")]
    Write(#[source] std::io::Error),

    /// No snapshot with the requested id exists.
    #[error("snapshot {0} not found")]
    SnapshotNotFound(String),

    /// A snapshot's recomputed checksum did not match the stored one,
    /// indicating storage corruption.
    #[error("snapshot {id} failed integrity check: stored {stored}, computed {computed}")]
    Integrity {
        id: String,
        stored: String,
        computed: String,
    },

    /// A database error occurred in the relational backend.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for history store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
