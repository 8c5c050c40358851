//! The history query facade.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{SchemaVersion, SnapshotId};
use event_store::{
    EventMetadata, EventQuery, HistoryStore, Snapshot, SnapshotInfo, StoreError,
};
use serde_json::json;
use tokio::sync::RwLock;

use crate::export::{AnalysisExport, EventPage, ExportDateRange, ExportFormat, ExportMetadata, to_csv};
use crate::log::EventLog;
use crate::snapshots::{SnapshotManager, StateProvider};
use crate::{HistoryError, Result};

/// Default page size for event listings when the caller names none.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Combines the event log, snapshot manager, and analytics engine behind
/// the query surface the HTTP layer consumes.
#[derive(Clone)]
pub struct HistoryService<S: HistoryStore> {
    log: EventLog<S>,
    snapshots: SnapshotManager<S>,
    state_provider: Option<Arc<dyn StateProvider>>,
}

impl<S: HistoryStore + Clone> HistoryService<S> {
    /// Creates the facade over a store. The log and snapshot manager
    /// share one schema-version stamp so a migration bump covers both.
    pub fn new(store: S) -> Self {
        let version = Arc::new(RwLock::new(SchemaVersion::current()));
        let log = EventLog::with_version(store.clone(), version.clone());
        let snapshots = SnapshotManager::with_version(store, version);
        Self {
            log,
            snapshots,
            state_provider: None,
        }
    }

    /// Wires a current-state provider, enabling daily automatic
    /// snapshots after each recorded event and state capture for manual
    /// snapshots and migration backups.
    pub fn with_state_provider(mut self, provider: Arc<dyn StateProvider>) -> Self {
        self.state_provider = Some(provider.clone());
        self.log = self
            .log
            .clone()
            .with_daily_snapshots(self.snapshots.clone(), provider);
        self
    }

    /// Returns the event recorder, for the domain layer to append through.
    pub fn log(&self) -> &EventLog<S> {
        &self.log
    }

    /// Returns the snapshot manager.
    pub fn snapshots(&self) -> &SnapshotManager<S> {
        &self.snapshots
    }

    /// Returns one page of the event log.
    ///
    /// A type filter takes optional date bounds; without a type, both
    /// bounds select a date range and no filter at all reads everything.
    /// `total` always reports the unlimited match count so callers can
    /// detect truncation.
    pub async fn events_page(
        &self,
        event_type: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<EventPage> {
        let events = match (event_type, start, end) {
            (Some(t), s, e) => self.log.events_by_type(t, s, e).await?,
            (None, Some(s), Some(e)) => self.log.events_by_date_range(s, e).await?,
            _ => self.log.read_all().await?,
        };

        let total = events.len();
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let events = events.into_iter().take(limit).collect();
        Ok(EventPage { events, total, limit })
    }

    /// Filters the log by an optional date window AND an optional type
    /// allow-list, then aggregates the result.
    pub async fn export_for_analysis(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        event_types: Option<Vec<String>>,
    ) -> Result<AnalysisExport> {
        let mut query = EventQuery::new();
        query.from = start;
        query.to = end;
        query.event_types = event_types.clone();

        let events = self.log.query(query).await?;
        let analytics = analytics::aggregate(&events);

        Ok(AnalysisExport {
            metadata: ExportMetadata {
                exported_at: Utc::now(),
                total_events: events.len(),
                date_range: ExportDateRange::new(start, end),
                event_types: match event_types {
                    Some(types) => json!(types),
                    None => json!("all"),
                },
            },
            events,
            analytics,
        })
    }

    /// Runs [`export_for_analysis`](Self::export_for_analysis) and
    /// serializes the result as pretty JSON or CSV.
    pub async fn export_formatted(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        event_types: Option<Vec<String>>,
        format: ExportFormat,
    ) -> Result<String> {
        let export = self.export_for_analysis(start, end, event_types).await?;
        match format {
            ExportFormat::Json => {
                Ok(serde_json::to_string_pretty(&export).map_err(StoreError::from)?)
            }
            ExportFormat::Csv => Ok(to_csv(&export.events)),
        }
    }

    /// Creates a snapshot of the given state and records the
    /// `snapshot_created` audit event.
    pub async fn create_snapshot(
        &self,
        data: serde_json::Value,
        reason: &str,
        metadata: EventMetadata,
    ) -> Result<Snapshot> {
        let snapshot = self.snapshots.create_snapshot(data, reason).await?;
        self.log
            .record(
                "snapshot_created",
                json!({"snapshotId": snapshot.id, "reason": &snapshot.reason}),
                metadata,
            )
            .await?;
        Ok(snapshot)
    }

    /// Creates a snapshot of the current application state, as supplied
    /// by the configured provider.
    pub async fn snapshot_current_state(
        &self,
        reason: &str,
        metadata: EventMetadata,
    ) -> Result<Snapshot> {
        let state = self.current_state_or_empty().await;
        self.create_snapshot(state, reason, metadata).await
    }

    /// Lists the stored snapshots.
    pub async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        self.snapshots.list_snapshots().await
    }

    /// Loads a snapshot by id, verifying its checksum.
    pub async fn read_snapshot(&self, id: SnapshotId) -> Result<Snapshot> {
        self.snapshots.read_snapshot(id).await
    }

    /// Runs a data migration under the audit trail.
    ///
    /// Takes a pre-migration backup snapshot, records `data_migration`,
    /// and runs the callback. Success bumps the schema version stamped on
    /// subsequent records and logs `data_migration_completed`; failure
    /// logs `data_migration_failed` before the error is re-raised. No
    /// rollback is attempted beyond the backup snapshot.
    #[tracing::instrument(skip(self, migration), fields(from = %from, to = %to))]
    pub async fn migrate_data<F, Fut, E>(
        &self,
        from: SchemaVersion,
        to: SchemaVersion,
        migration: F,
    ) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<(), E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let state = self.current_state_or_empty().await;
        let reason = format!("migration_backup_{from}_to_{to}");
        self.snapshots.create_snapshot(state, &reason).await?;

        self.log
            .record(
                "data_migration",
                json!({"fromVersion": &from, "toVersion": &to}),
                EventMetadata::new(),
            )
            .await?;

        match migration().await {
            Ok(()) => {
                self.log.set_schema_version(to.clone()).await;
                self.log
                    .record(
                        "data_migration_completed",
                        json!({"fromVersion": &from, "toVersion": &to}),
                        EventMetadata::new(),
                    )
                    .await?;
                Ok(())
            }
            Err(e) => {
                let source = e.into();
                let failure = self
                    .log
                    .record(
                        "data_migration_failed",
                        json!({
                            "fromVersion": &from,
                            "toVersion": &to,
                            "error": source.to_string(),
                        }),
                        EventMetadata::new(),
                    )
                    .await;
                if let Err(log_err) = failure {
                    tracing::error!(error = %log_err, "failed to record migration failure");
                }
                Err(HistoryError::Migration { from, to, source })
            }
        }
    }

    async fn current_state_or_empty(&self) -> serde_json::Value {
        if let Some(provider) = &self.state_provider {
            match provider.current_state().await {
                Ok(state) => return state,
                Err(e) => {
                    tracing::warn!(error = %e, "state provider failed, snapshotting version only");
                }
            }
        }
        json!({"version": self.log.schema_version().await})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use event_store::InMemoryStore;

    struct FixedState(serde_json::Value);

    #[async_trait]
    impl StateProvider for FixedState {
        async fn current_state(
            &self,
        ) -> std::result::Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>>
        {
            Ok(self.0.clone())
        }
    }

    fn service() -> HistoryService<InMemoryStore> {
        HistoryService::new(InMemoryStore::new())
    }

    async fn record_typed(svc: &HistoryService<InMemoryStore>, event_type: &str, id: i64) {
        svc.log()
            .record(event_type, json!({"id": id}), EventMetadata::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn export_combines_date_and_type_filters_with_and() {
        let svc = service();
        record_typed(&svc, "task_created", 1).await;
        record_typed(&svc, "task_deleted", 1).await;
        record_typed(&svc, "shopping_item_created", 2).await;

        let export = svc
            .export_for_analysis(
                Some(Utc::now() - Duration::hours(1)),
                Some(Utc::now() + Duration::hours(1)),
                Some(vec!["task_created".into(), "task_deleted".into()]),
            )
            .await
            .unwrap();

        assert_eq!(export.metadata.total_events, 2);
        assert_eq!(export.events.len(), 2);
        assert_eq!(export.analytics.event_type_counts.len(), 2);
        assert_eq!(export.metadata.event_types, json!(["task_created", "task_deleted"]));
    }

    #[tokio::test]
    async fn export_with_unmatched_type_list_is_empty_not_an_error() {
        let svc = service();
        record_typed(&svc, "task_created", 1).await;

        let export = svc
            .export_for_analysis(None, None, Some(vec!["timeblock_created".into()]))
            .await
            .unwrap();

        assert!(export.events.is_empty());
        assert_eq!(export.metadata.total_events, 0);
        assert!(export.analytics.event_type_counts.is_empty());
    }

    #[tokio::test]
    async fn export_metadata_labels_open_bounds_all() {
        let svc = service();
        let export = svc.export_for_analysis(None, None, None).await.unwrap();
        assert_eq!(export.metadata.date_range.start, "all");
        assert_eq!(export.metadata.date_range.end, "all");
        assert_eq!(export.metadata.event_types, json!("all"));
    }

    #[tokio::test]
    async fn formatted_csv_export_carries_one_row_per_event() {
        let svc = service();
        record_typed(&svc, "task_created", 1).await;
        record_typed(&svc, "task_completed", 1).await;

        let csv = svc
            .export_formatted(None, None, None, ExportFormat::Csv)
            .await
            .unwrap();

        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "id,type,timestamp,data,version,userAgent,ip");
        assert!(lines[1].contains("task_created"));
    }

    #[tokio::test]
    async fn formatted_json_export_parses_back() {
        let svc = service();
        record_typed(&svc, "task_created", 1).await;

        let out = svc
            .export_formatted(None, None, None, ExportFormat::Json)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["metadata"]["totalEvents"], 1);
        assert_eq!(parsed["analytics"]["eventTypeCounts"]["task_created"], 1);
    }

    #[tokio::test]
    async fn events_page_reports_unlimited_total() {
        let svc = service();
        for i in 0..7 {
            record_typed(&svc, "task_created", i).await;
        }

        let page = svc
            .events_page(Some("task_created"), None, None, Some(3))
            .await
            .unwrap();

        assert_eq!(page.events.len(), 3);
        assert_eq!(page.total, 7);
        assert_eq!(page.limit, 3);
    }

    #[tokio::test]
    async fn events_page_defaults_limit() {
        let svc = service();
        record_typed(&svc, "task_created", 1).await;

        let page = svc.events_page(None, None, None, None).await.unwrap();
        assert_eq!(page.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn create_snapshot_records_audit_event() {
        let svc = service();
        let snapshot = svc
            .create_snapshot(json!({"tasks": []}), "manual", EventMetadata::new())
            .await
            .unwrap();

        let events = svc.log().read_all().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "snapshot_created");
        assert_eq!(events[0].data["snapshotId"], json!(snapshot.id));

        let read = svc.read_snapshot(snapshot.id).await.unwrap();
        assert_eq!(read.checksum, snapshot.checksum);
    }

    #[tokio::test]
    async fn snapshot_current_state_uses_provider() {
        let svc = service()
            .with_state_provider(Arc::new(FixedState(json!({"tasks": [{"id": 9}]}))));

        let snapshot = svc
            .snapshot_current_state("manual", EventMetadata::new())
            .await
            .unwrap();
        assert_eq!(snapshot.data["tasks"][0]["id"], 9);
    }

    #[tokio::test]
    async fn successful_migration_bumps_version_and_leaves_trail() {
        let svc = service();
        svc.migrate_data(
            SchemaVersion::new("1.0.0"),
            SchemaVersion::new("2.0.0"),
            || async { Ok::<(), std::io::Error>(()) },
        )
        .await
        .unwrap();

        assert_eq!(svc.log().schema_version().await.as_str(), "2.0.0");

        let types: Vec<_> = svc
            .log()
            .read_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(types, vec!["data_migration", "data_migration_completed"]);

        let snapshots = svc.list_snapshots().await.unwrap();
        assert_eq!(snapshots.len(), 1);
    }

    #[tokio::test]
    async fn failed_migration_is_recorded_then_raised() {
        let svc = service();
        let result = svc
            .migrate_data(
                SchemaVersion::new("1.0.0"),
                SchemaVersion::new("2.0.0"),
                || async { Err::<(), _>(std::io::Error::other("boom")) },
            )
            .await;

        assert!(matches!(result, Err(HistoryError::Migration { .. })));

        // Version stays put on failure.
        assert_eq!(svc.log().schema_version().await.as_str(), "1.0.0");

        let events = svc.log().read_all().await.unwrap();
        let types: Vec<_> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["data_migration", "data_migration_failed"]);
        assert_eq!(events[1].data["error"], "boom");
    }
}
