use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::SnapshotId;
use tokio::sync::RwLock;

use crate::{
    Event, EventQuery, Result, Snapshot, SnapshotInfo, StoreError,
    store::{EventStream, HistoryStore},
};

/// In-memory history store implementation for testing.
///
/// Stores all events and snapshots in memory behind the same interface
/// as the file and Postgres implementations.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    events: Arc<RwLock<Vec<Event>>>,
    snapshots: Arc<RwLock<HashMap<SnapshotId, Snapshot>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Clears all events and snapshots.
    pub async fn clear(&self) {
        self.events.write().await.clear();
        self.snapshots.write().await.clear();
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn append(&self, event: Event) -> Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Event>> {
        Ok(self.events.read().await.clone())
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<Event>> {
        let events = self.events.read().await;
        let filtered = events.iter().filter(|e| query.matches(e)).cloned();

        let offset = query.offset.unwrap_or(0);
        let filtered: Vec<_> = match query.limit {
            Some(limit) => filtered.skip(offset).take(limit).collect(),
            None => filtered.skip(offset).collect(),
        };

        Ok(filtered)
    }

    async fn stream_all(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.events.read().await.clone();
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        self.snapshots.write().await.insert(snapshot.id, snapshot);
        Ok(())
    }

    async fn load_snapshot(&self, id: SnapshotId) -> Result<Snapshot> {
        self.snapshots
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::SnapshotNotFound(id.to_string()))
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        let snapshots = self.snapshots.read().await;
        let mut infos: Vec<_> = snapshots
            .values()
            .map(|s| SnapshotInfo {
                id: s.id,
                date: s.timestamp.date_naive(),
                storage_key: s.storage_key(),
            })
            .collect();
        infos.sort_by(|a, b| a.storage_key.cmp(&b.storage_key));
        Ok(infos)
    }
}
