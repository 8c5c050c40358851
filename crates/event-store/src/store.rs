use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::SnapshotId;
use futures_core::Stream;

use crate::{Event, EventQuery, Result, Snapshot, SnapshotInfo};

/// A stream of events in append order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event>> + Send>>;

/// Persistence port for the historical-data subsystem.
///
/// The core logic depends only on this trait, never on which backend is
/// active; implementations cover JSON files, Postgres, and an in-memory
/// store for tests. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends one event durably.
    ///
    /// Success means the event survives process restart. On failure the
    /// event is considered not recorded; no partial-write state is ever
    /// exposed.
    async fn append(&self, event: Event) -> Result<()>;

    /// Returns every stored event in append order.
    ///
    /// A missing or unreadable backing log yields an empty vec rather
    /// than an error: first runs and corrupted logs degrade gracefully
    /// on the read path.
    async fn read_all(&self) -> Result<Vec<Event>>;

    /// Returns the events matching a query, in append order.
    async fn query_events(&self, query: EventQuery) -> Result<Vec<Event>>;

    /// Streams every stored event in append order.
    async fn stream_all(&self) -> Result<EventStream>;

    /// Persists a snapshot under its storage key.
    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()>;

    /// Loads a snapshot by exact id.
    ///
    /// Fails with [`StoreError::SnapshotNotFound`] when no stored
    /// snapshot carries that id.
    ///
    /// [`StoreError::SnapshotNotFound`]: crate::StoreError::SnapshotNotFound
    async fn load_snapshot(&self, id: SnapshotId) -> Result<Snapshot>;

    /// Lists the stored snapshots without loading their bodies.
    ///
    /// Unrelated files sharing the storage area are skipped, not errors.
    async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>>;
}

/// Extension trait providing convenience queries over [`HistoryStore`].
#[async_trait]
pub trait HistoryStoreExt: HistoryStore {
    /// Returns events of one type, optionally bounded by inclusive
    /// timestamps. Either bound may be omitted independently.
    async fn read_by_type(
        &self,
        event_type: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Event>> {
        let mut query = EventQuery::for_type(event_type);
        query.from = start;
        query.to = end;
        self.query_events(query).await
    }

    /// Returns events within an inclusive date range. Both bounds are
    /// required.
    async fn read_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        self.query_events(EventQuery::new().from(start).to(end)).await
    }

    /// Whether any stored snapshot was taken on the given UTC calendar day.
    async fn snapshot_exists_for_day(&self, day: NaiveDate) -> Result<bool> {
        Ok(self
            .list_snapshots()
            .await?
            .iter()
            .any(|info| info.date == day))
    }
}

// Blanket implementation for all HistoryStore implementations
impl<T: HistoryStore + ?Sized> HistoryStoreExt for T {}
