use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use common::SnapshotId;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{
    Event, EventQuery, Result, Snapshot, SnapshotInfo, StoreError,
    store::{EventStream, HistoryStore},
};

/// JSON-file-backed history store.
///
/// The event log is a single JSON array file rewritten as a whole on every
/// append; snapshots are individual files named
/// `snapshot_<date>_<id>.json` in their own directory. Mutations are
/// serialized behind an in-process mutex, so concurrent requests within
/// one process cannot drop each other's writes. Cross-process writers
/// still race last-write-wins; that limitation is accepted for the
/// single-user file mode.
#[derive(Clone)]
pub struct FileBackedStore {
    data_dir: PathBuf,
    events_path: PathBuf,
    snapshots_dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileBackedStore {
    /// Creates a store rooted at the given data directory.
    ///
    /// Nothing touches the filesystem until [`init`](Self::init) or the
    /// first operation runs.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            events_path: data_dir.join("events.json"),
            snapshots_dir: data_dir.join("snapshots"),
            data_dir,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the path of the event log file.
    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    /// Returns the snapshot directory path.
    pub fn snapshots_dir(&self) -> &Path {
        &self.snapshots_dir
    }

    /// Ensures the data directory, snapshot directory, and event log file
    /// exist. Idempotent: safe to call on every startup, never clobbers
    /// existing data.
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(StoreError::Write)?;
        tokio::fs::create_dir_all(&self.snapshots_dir)
            .await
            .map_err(StoreError::Write)?;

        if tokio::fs::try_exists(&self.events_path)
            .await
            .map_err(StoreError::Read)?
        {
            return Ok(());
        }
        write_durably(&self.events_path, b"[]").await
    }

    /// Loads the full event log, propagating every failure.
    ///
    /// Used on the append path: if the existing log cannot be read, the
    /// append must fail rather than rewrite the file from a partial view
    /// and silently truncate history.
    async fn load_events_strict(&self) -> Result<Vec<Event>> {
        let bytes = match tokio::fs::read(&self.events_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Read(e)),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl HistoryStore for FileBackedStore {
    async fn append(&self, event: Event) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut events = self.load_events_strict().await?;
        events.push(event);

        let json = serde_json::to_vec_pretty(&events)?;
        write_durably(&self.events_path, &json).await?;

        metrics::counter!("store_events_appended").increment(1);
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Event>> {
        match self.load_events_strict().await {
            Ok(events) => Ok(events),
            Err(e) => {
                tracing::warn!(error = %e, path = %self.events_path.display(),
                    "event log unreadable, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<Event>> {
        let events = self.read_all().await?;
        let filtered = events.into_iter().filter(|e| query.matches(e));

        let offset = query.offset.unwrap_or(0);
        let filtered: Vec<_> = match query.limit {
            Some(limit) => filtered.skip(offset).take(limit).collect(),
            None => filtered.skip(offset).collect(),
        };

        Ok(filtered)
    }

    async fn stream_all(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.read_all().await?;
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.snapshots_dir)
            .await
            .map_err(StoreError::Write)?;

        let path = self.snapshots_dir.join(snapshot.storage_key());
        let json = serde_json::to_vec_pretty(&snapshot)?;
        write_durably(&path, &json).await
    }

    async fn load_snapshot(&self, id: SnapshotId) -> Result<Snapshot> {
        let info = self
            .list_snapshots()
            .await?
            .into_iter()
            .find(|info| info.id == id)
            .ok_or_else(|| StoreError::SnapshotNotFound(id.to_string()))?;

        let path = self.snapshots_dir.join(&info.storage_key);
        let bytes = tokio::fs::read(&path).await.map_err(StoreError::Read)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        let mut dir = match tokio::fs::read_dir(&self.snapshots_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Read(e)),
        };

        let mut infos = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(StoreError::Read)? {
            let name = entry.file_name();
            // Unrelated files in the snapshot directory are skipped.
            if let Some(info) = name.to_str().and_then(SnapshotInfo::parse_key) {
                infos.push(info);
            }
        }
        infos.sort_by(|a, b| a.storage_key.cmp(&b.storage_key));
        Ok(infos)
    }
}

/// Writes bytes to `path` via a temp file, fsync, and atomic rename.
///
/// Readers never observe a half-written file, and once this returns the
/// data has reached disk: success is the durability point the append
/// contract promises.
async fn write_durably(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");

    let mut file = tokio::fs::File::create(&tmp)
        .await
        .map_err(StoreError::Write)?;
    file.write_all(bytes).await.map_err(StoreError::Write)?;
    file.sync_all().await.map_err(StoreError::Write)?;
    drop(file);

    tokio::fs::rename(&tmp, path).await.map_err(StoreError::Write)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HistoryStoreExt;
    use common::SchemaVersion;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store() -> (FileBackedStore, TempDir) {
        let dir = TempDir::new().unwrap();
        (FileBackedStore::new(dir.path()), dir)
    }

    fn test_event(event_type: &str, data: serde_json::Value) -> Event {
        Event::builder().event_type(event_type).data_raw(data).build()
    }

    #[tokio::test]
    async fn init_is_idempotent_and_preserves_data() {
        let (store, _dir) = test_store();
        store.init().await.unwrap();
        store
            .append(test_event("task_created", json!({"id": 1})))
            .await
            .unwrap();

        // Re-init must not clobber the existing log.
        store.init().await.unwrap();
        assert_eq!(store.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn append_then_read_all_preserves_order() {
        let (store, _dir) = test_store();
        store.init().await.unwrap();

        for i in 0..4 {
            store
                .append(test_event("task_created", json!({"id": i})))
                .await
                .unwrap();
        }

        let events = store.read_all().await.unwrap();
        assert_eq!(events.len(), 4);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.data["id"], i);
        }
    }

    #[tokio::test]
    async fn append_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileBackedStore::new(dir.path());
            store.init().await.unwrap();
            store
                .append(test_event("server_started", json!({})))
                .await
                .unwrap();
        }

        let reopened = FileBackedStore::new(dir.path());
        let events = reopened.read_all().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "server_started");
    }

    #[tokio::test]
    async fn read_all_on_missing_log_is_empty() {
        let (store, _dir) = test_store();
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_all_on_corrupt_log_is_empty() {
        let (store, _dir) = test_store();
        store.init().await.unwrap();
        tokio::fs::write(store.events_path(), b"{ not json").await.unwrap();

        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_refuses_to_rewrite_a_corrupt_log() {
        let (store, _dir) = test_store();
        store.init().await.unwrap();
        store
            .append(test_event("task_created", json!({"id": 1})))
            .await
            .unwrap();
        tokio::fs::write(store.events_path(), b"{ not json").await.unwrap();

        let result = store.append(test_event("task_created", json!({"id": 2}))).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn query_by_type_with_date_bounds() {
        let (store, _dir) = test_store();
        store.init().await.unwrap();

        let t0 = chrono::Utc::now();
        for event_type in ["task_created", "task_completed", "task_created"] {
            store.append(test_event(event_type, json!({}))).await.unwrap();
        }

        let found = store
            .read_by_type("task_created", Some(t0 - chrono::Duration::hours(1)), None)
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn snapshot_roundtrip_through_disk() {
        let (store, _dir) = test_store();
        store.init().await.unwrap();

        let snapshot = Snapshot::capture(
            json!({"tasks": [{"id": 1, "text": "buy \"milk\""}]}),
            "manual",
            SchemaVersion::current(),
        );
        let id = snapshot.id;
        let checksum = snapshot.checksum.clone();
        store.save_snapshot(snapshot).await.unwrap();

        let loaded = store.load_snapshot(id).await.unwrap();
        assert_eq!(loaded.checksum, checksum);
        assert!(loaded.verify_integrity().is_ok());
    }

    #[tokio::test]
    async fn list_snapshots_skips_unrelated_files() {
        let (store, _dir) = test_store();
        store.init().await.unwrap();

        let snapshot = Snapshot::capture(json!({}), "manual", SchemaVersion::current());
        let id = snapshot.id;
        store.save_snapshot(snapshot).await.unwrap();

        tokio::fs::write(store.snapshots_dir().join("README.txt"), b"hi")
            .await
            .unwrap();
        tokio::fs::write(store.snapshots_dir().join("snapshot_junk.json"), b"{}")
            .await
            .unwrap();

        let infos = store.list_snapshots().await.unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].id, id);
    }

    #[tokio::test]
    async fn load_snapshot_unknown_id_is_not_found() {
        let (store, _dir) = test_store();
        store.init().await.unwrap();

        let result = store.load_snapshot(SnapshotId::new()).await;
        assert!(matches!(result, Err(StoreError::SnapshotNotFound(_))));
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let (store, _dir) = test_store();
        store.init().await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(test_event("task_created", json!({"id": i})))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.read_all().await.unwrap().len(), 8);
    }
}
