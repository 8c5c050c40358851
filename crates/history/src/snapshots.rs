//! Snapshot creation, listing, and integrity-checked reads.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{SchemaVersion, SnapshotId};
use event_store::{HistoryStore, HistoryStoreExt, Snapshot, SnapshotInfo};
use tokio::sync::RwLock;

use crate::Result;

/// Supplies the current full application state for snapshotting.
///
/// Implemented by the layer that owns the current-state storage (the
/// entity repositories); the snapshot machinery itself never knows what
/// the state looks like.
#[async_trait]
pub trait StateProvider: Send + Sync {
    /// Returns the current state as a JSON document.
    async fn current_state(
        &self,
    ) -> std::result::Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>>;
}

/// Creates and reads point-in-time snapshots through the store port.
///
/// Snapshots are full-state captures, deliberately favoring trivial
/// restore over storage efficiency at personal scale.
#[derive(Clone)]
pub struct SnapshotManager<S: HistoryStore> {
    store: S,
    version: Arc<RwLock<SchemaVersion>>,
}

impl<S: HistoryStore + Clone> SnapshotManager<S> {
    /// Creates a manager over the given store, stamping the current
    /// schema version on new snapshots.
    pub fn new(store: S) -> Self {
        Self::with_version(store, Arc::new(RwLock::new(SchemaVersion::current())))
    }

    /// Creates a manager sharing an externally owned version stamp.
    pub(crate) fn with_version(store: S, version: Arc<RwLock<SchemaVersion>>) -> Self {
        Self { store, version }
    }

    /// Captures and persists a snapshot of the given state.
    ///
    /// The reason tag is opaque metadata; "manual", "daily_auto" and
    /// "migration_backup_<from>_to_<to>" are conventions, not an enum.
    #[tracing::instrument(skip(self, data), fields(reason = %reason))]
    pub async fn create_snapshot(
        &self,
        data: serde_json::Value,
        reason: &str,
    ) -> Result<Snapshot> {
        let version = self.version.read().await.clone();
        let snapshot = Snapshot::capture(data, reason, version);
        self.store.save_snapshot(snapshot.clone()).await?;

        metrics::counter!("snapshots_created").increment(1);
        tracing::info!(id = %snapshot.id, reason = %snapshot.reason, "snapshot created");
        Ok(snapshot)
    }

    /// Creates today's automatic snapshot if none exists yet.
    ///
    /// Idempotent per UTC calendar day: a second call on the same day is
    /// a no-op returning `None`. A failing state provider is logged and
    /// tolerated: recording the triggering event must never be blocked
    /// by snapshot bookkeeping.
    pub async fn ensure_daily_snapshot(
        &self,
        provider: &dyn StateProvider,
    ) -> Result<Option<Snapshot>> {
        let today = Utc::now().date_naive();
        if self.store.snapshot_exists_for_day(today).await? {
            return Ok(None);
        }

        let state = match provider.current_state().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "state provider failed, skipping daily snapshot");
                return Ok(None);
            }
        };

        self.create_snapshot(state, "daily_auto").await.map(Some)
    }

    /// Lists the stored snapshots.
    pub async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        Ok(self.store.list_snapshots().await?)
    }

    /// Loads a snapshot by id and verifies its checksum.
    ///
    /// A checksum mismatch surfaces as an integrity error; corrupted
    /// state is never returned as if it were valid.
    pub async fn read_snapshot(&self, id: SnapshotId) -> Result<Snapshot> {
        let snapshot = self.store.load_snapshot(id).await?;
        snapshot.verify_integrity()?;
        Ok(snapshot)
    }
}
