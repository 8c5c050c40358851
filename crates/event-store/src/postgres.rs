use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EventId, SchemaVersion, SnapshotId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Event, EventMetadata, EventQuery, Result, Snapshot, SnapshotInfo, StoreError,
    store::{EventStream, HistoryStore},
};

/// PostgreSQL-backed history store implementation.
///
/// The relational mode replaces the whole-file rewrite of the file backend
/// with row-level inserts, which also closes the cross-process
/// read-modify-write race the file mode accepts.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL history store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_event(row: PgRow) -> Result<Event> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: EventMetadata = serde_json::from_value(metadata_json)?;

        Ok(Event {
            id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            timestamp: row.try_get("timestamp")?,
            data: row.try_get("data")?,
            version: SchemaVersion::new(row.try_get::<String, _>("version")?),
            metadata,
        })
    }

    fn row_to_snapshot(row: PgRow) -> Result<Snapshot> {
        Ok(Snapshot {
            id: SnapshotId::from_uuid(row.try_get::<Uuid, _>("id")?),
            timestamp: row.try_get::<DateTime<Utc>, _>("timestamp")?,
            version: SchemaVersion::new(row.try_get::<String, _>("version")?),
            reason: row.try_get("reason")?,
            data: row.try_get("data")?,
            checksum: row.try_get("checksum")?,
        })
    }
}

#[async_trait]
impl HistoryStore for PostgresStore {
    async fn append(&self, event: Event) -> Result<()> {
        let metadata_json = serde_json::to_value(&event.metadata)?;

        sqlx::query(
            r#"
            INSERT INTO events (id, event_type, timestamp, data, version, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(&event.event_type)
        .bind(event.timestamp)
        .bind(&event.data)
        .bind(event.version.as_str())
        .bind(metadata_json)
        .execute(&self.pool)
        .await?;

        metrics::counter!("store_events_appended").increment(1);
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, timestamp, data, version, metadata
            FROM events
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<Event>> {
        let mut sql = String::from(
            "SELECT id, event_type, timestamp, data, version, metadata FROM events WHERE 1=1",
        );
        let mut param_count = 0;

        // Build dynamic query
        if query.event_types.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND event_type = ANY(${param_count})"));
        }
        if query.from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND timestamp >= ${param_count}"));
        }
        if query.to.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND timestamp <= ${param_count}"));
        }

        sql.push_str(" ORDER BY seq ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(event_types) = query.event_types {
            sqlx_query = sqlx_query.bind(event_types);
        }
        if let Some(from) = query.from {
            sqlx_query = sqlx_query.bind(from);
        }
        if let Some(to) = query.to {
            sqlx_query = sqlx_query.bind(to);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn stream_all(&self) -> Result<EventStream> {
        use futures_util::StreamExt;

        let stream = sqlx::query(
            r#"
            SELECT id, event_type, timestamp, data, version, metadata
            FROM events
            ORDER BY seq ASC
            "#,
        )
        .fetch(&self.pool)
        .map(|result| match result {
            Ok(row) => Self::row_to_event(row),
            Err(e) => Err(StoreError::Database(e)),
        });

        Ok(Box::pin(stream))
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO snapshots (id, timestamp, version, reason, data, checksum)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(snapshot.id.as_uuid())
        .bind(snapshot.timestamp)
        .bind(snapshot.version.as_str())
        .bind(&snapshot.reason)
        .bind(&snapshot.data)
        .bind(&snapshot.checksum)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_snapshot(&self, id: SnapshotId) -> Result<Snapshot> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, timestamp, version, reason, data, checksum
            FROM snapshots
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_snapshot(row),
            None => Err(StoreError::SnapshotNotFound(id.to_string())),
        }
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        let rows = sqlx::query(
            r#"
            SELECT id, timestamp
            FROM snapshots
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let id = SnapshotId::from_uuid(row.try_get::<Uuid, _>("id")?);
                let timestamp: DateTime<Utc> = row.try_get("timestamp")?;
                let date = timestamp.date_naive();
                Ok(SnapshotInfo {
                    id,
                    date,
                    // Synthesized for parity with the file backend's keys.
                    storage_key: format!("snapshot_{date}_{id}.json"),
                })
            })
            .collect()
    }
}
