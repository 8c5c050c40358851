//! Append-only event store and snapshot persistence.
//!
//! The [`HistoryStore`] trait is the persistence port of the
//! historical-data subsystem; everything above it depends only on the
//! trait. Three implementations are provided: [`FileBackedStore`] (JSON
//! files, the default single-user mode), [`PostgresStore`] (relational),
//! and [`InMemoryStore`] (tests).

pub mod error;
pub mod event;
pub mod file;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod snapshot;
pub mod store;

pub use common::{EventId, SchemaVersion, SnapshotId};
pub use error::{Result, StoreError};
pub use event::{Event, EventBuilder, EventMetadata};
pub use file::FileBackedStore;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::EventQuery;
pub use snapshot::{Snapshot, SnapshotInfo, checksum_of};
pub use store::{EventStream, HistoryStore, HistoryStoreExt};
