//! File-backed current-state storage, one JSON array file per resource.
//!
//! Entities live here, not in the event log: the log is a derived audit
//! trail of their changes. Reads on a missing or corrupt file degrade to
//! an empty collection; mutations load strictly so a corrupt file is
//! never silently rewritten from a partial view.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{DomainError, Result};

/// A JSON-array file holding the current state of one resource.
///
/// Mutations are whole-collection read-modify-write, serialized behind an
/// in-process mutex.
#[derive(Clone)]
pub struct JsonCollection<T> {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonCollection<T> {
    /// Creates a collection stored at the given file path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Arc::new(Mutex::new(())),
            _marker: PhantomData,
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensures the backing file exists. Idempotent; never clobbers
    /// existing data.
    pub async fn init(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(DomainError::StateWrite)?;
        }
        if tokio::fs::try_exists(&self.path)
            .await
            .map_err(DomainError::StateRead)?
        {
            return Ok(());
        }
        self.write_durably(b"[]").await
    }

    /// Reads the collection, treating a missing or unreadable file as
    /// empty.
    pub async fn read(&self) -> Result<Vec<T>> {
        match self.load_strict().await {
            Ok(items) => Ok(items),
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(),
                    "state file unreadable, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Applies a mutation under the write lock.
    ///
    /// The closure returns `Some(result)` to persist its changes or
    /// `None` to abandon them (entity not found); only a `Some` outcome
    /// rewrites the file.
    pub async fn mutate<R>(&self, f: impl FnOnce(&mut Vec<T>) -> Option<R>) -> Result<Option<R>> {
        let _guard = self.lock.lock().await;

        let mut items = self.load_strict().await?;
        let Some(result) = f(&mut items) else {
            return Ok(None);
        };

        let json = serde_json::to_vec_pretty(&items)?;
        self.write_durably(&json).await?;
        Ok(Some(result))
    }

    async fn load_strict(&self) -> Result<Vec<T>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DomainError::StateRead(e)),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_durably(&self, bytes: &[u8]) -> Result<()> {
        let tmp = self.path.with_extension("tmp");

        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(DomainError::StateWrite)?;
        file.write_all(bytes).await.map_err(DomainError::StateWrite)?;
        file.sync_all().await.map_err(DomainError::StateWrite)?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(DomainError::StateWrite)
    }
}

/// Millisecond-clock entity id, guarded against same-millisecond
/// collisions by taking the successor of the current maximum when the
/// clock has not advanced past it.
pub(crate) fn next_entity_id(existing_max: Option<i64>, now_ms: i64) -> i64 {
    match existing_max {
        Some(max) if max >= now_ms => max + 1,
        _ => now_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: i64,
        label: String,
    }

    fn collection(dir: &TempDir) -> JsonCollection<Row> {
        JsonCollection::new(dir.path().join("rows.json"))
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let rows = collection(&dir);
        rows.init().await.unwrap();
        rows.mutate(|items| {
            items.push(Row { id: 1, label: "a".into() });
            Some(())
        })
        .await
        .unwrap();

        rows.init().await.unwrap();
        assert_eq!(rows.read().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mutate_persists_and_read_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let rows = collection(&dir);
            rows.init().await.unwrap();
            rows.mutate(|items| {
                items.push(Row { id: 1, label: "a".into() });
                Some(())
            })
            .await
            .unwrap();
        }

        let reopened: JsonCollection<Row> = JsonCollection::new(dir.path().join("rows.json"));
        let items = reopened.read().await.unwrap();
        assert_eq!(items, vec![Row { id: 1, label: "a".into() }]);
    }

    #[tokio::test]
    async fn abandoned_mutation_does_not_write() {
        let dir = TempDir::new().unwrap();
        let rows = collection(&dir);
        rows.init().await.unwrap();

        let before = tokio::fs::read(rows.path()).await.unwrap();
        let outcome: Option<()> = rows.mutate(|_| None).await.unwrap();
        assert!(outcome.is_none());

        let after = tokio::fs::read(rows.path()).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn read_on_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let rows = collection(&dir);
        assert!(rows.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_on_corrupt_file_is_empty_but_mutate_refuses() {
        let dir = TempDir::new().unwrap();
        let rows = collection(&dir);
        rows.init().await.unwrap();
        tokio::fs::write(rows.path(), b"oops").await.unwrap();

        assert!(rows.read().await.unwrap().is_empty());

        let result = rows
            .mutate(|items| {
                items.push(Row { id: 1, label: "a".into() });
                Some(())
            })
            .await;
        assert!(matches!(result, Err(DomainError::Serialization(_))));
    }

    #[test]
    fn next_entity_id_prefers_clock_but_never_collides() {
        assert_eq!(next_entity_id(None, 1000), 1000);
        assert_eq!(next_entity_id(Some(500), 1000), 1000);
        assert_eq!(next_entity_id(Some(1000), 1000), 1001);
        assert_eq!(next_entity_id(Some(2000), 1000), 2001);
    }
}
