//! The event recorder: turns domain actions into stored audit events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::SchemaVersion;
use event_store::{Event, EventMetadata, EventQuery, HistoryStore, HistoryStoreExt};
use tokio::sync::RwLock;

use crate::Result;
use crate::snapshots::{SnapshotManager, StateProvider};

/// Records audit events against a [`HistoryStore`].
///
/// `record` is the single entry point domain operations call once per
/// create/update/delete: it stamps a fresh id, the current UTC time, and
/// the log's current schema version, then appends durably. When the log
/// is wired to a snapshot manager and state provider, each successful
/// append also checks whether today's automatic snapshot exists yet.
#[derive(Clone)]
pub struct EventLog<S: HistoryStore> {
    store: S,
    version: Arc<RwLock<SchemaVersion>>,
    daily: Option<(SnapshotManager<S>, Arc<dyn StateProvider>)>,
}

impl<S: HistoryStore + Clone> EventLog<S> {
    /// Creates a recorder over the given store, stamping the current
    /// schema version.
    pub fn new(store: S) -> Self {
        Self::with_version(store, Arc::new(RwLock::new(SchemaVersion::current())))
    }

    /// Creates a recorder sharing an externally owned version stamp.
    pub(crate) fn with_version(store: S, version: Arc<RwLock<SchemaVersion>>) -> Self {
        Self {
            store,
            version,
            daily: None,
        }
    }

    /// Enables the daily automatic snapshot check after each append.
    pub fn with_daily_snapshots(
        mut self,
        snapshots: SnapshotManager<S>,
        provider: Arc<dyn StateProvider>,
    ) -> Self {
        self.daily = Some((snapshots, provider));
        self
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the schema version currently stamped on new events.
    pub async fn schema_version(&self) -> SchemaVersion {
        self.version.read().await.clone()
    }

    /// Replaces the schema version stamped on new events. Called by the
    /// migration hook after a successful migration.
    pub async fn set_schema_version(&self, version: SchemaVersion) {
        *self.version.write().await = version;
    }

    /// Records one audit event and returns the stored record.
    ///
    /// Write failures propagate: the event is considered not recorded.
    /// The daily snapshot check runs after the append and is best-effort;
    /// its failures are logged and never fail the caller.
    #[tracing::instrument(skip(self, data, metadata), fields(event_type = %event_type))]
    pub async fn record(
        &self,
        event_type: &str,
        data: serde_json::Value,
        metadata: EventMetadata,
    ) -> Result<Event> {
        let event = Event::builder()
            .event_type(event_type)
            .data_raw(data)
            .version(self.schema_version().await)
            .metadata(metadata)
            .build();

        self.store.append(event.clone()).await?;
        metrics::counter!("history_events_recorded").increment(1);

        if let Some((snapshots, provider)) = &self.daily
            && let Err(e) = snapshots.ensure_daily_snapshot(provider.as_ref()).await
        {
            tracing::warn!(error = %e, "daily snapshot check failed");
        }

        Ok(event)
    }

    /// Returns every recorded event in append order.
    pub async fn read_all(&self) -> Result<Vec<Event>> {
        Ok(self.store.read_all().await?)
    }

    /// Returns events of one type, optionally bounded by inclusive
    /// timestamps.
    pub async fn events_by_type(
        &self,
        event_type: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Event>> {
        Ok(self.store.read_by_type(event_type, start, end).await?)
    }

    /// Returns events within an inclusive date range.
    pub async fn events_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        Ok(self.store.read_by_date_range(start, end).await?)
    }

    /// Returns events matching an arbitrary query.
    pub async fn query(&self, query: EventQuery) -> Result<Vec<Event>> {
        Ok(self.store.query_events(query).await?)
    }
}
