use chrono::{DateTime, NaiveDate, Utc};
use common::{SchemaVersion, SnapshotId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, StoreError};

/// A full-state capture at a point in time, integrity-checked via checksum.
///
/// Snapshots deliberately store the complete state rather than incremental
/// diffs: restore stays trivial and the cost is acceptable at personal
/// scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique identifier for this snapshot.
    pub id: SnapshotId,

    /// When the snapshot was taken, UTC.
    pub timestamp: DateTime<Utc>,

    /// Schema version the state was written under.
    pub version: SchemaVersion,

    /// Why the snapshot was taken. Conventional values are "manual",
    /// "daily_auto" and "migration_backup_<from>_to_<to>", but the tag is
    /// opaque metadata and never validated.
    pub reason: String,

    /// The captured state.
    pub data: serde_json::Value,

    /// Lower-hex SHA-256 of the serialized `data`.
    pub checksum: String,
}

impl Snapshot {
    /// Captures a snapshot of the given state, computing its checksum and
    /// stamping a fresh id and the current time.
    pub fn capture(
        data: serde_json::Value,
        reason: impl Into<String>,
        version: SchemaVersion,
    ) -> Self {
        let checksum = checksum_of(&data);
        Self {
            id: SnapshotId::new(),
            timestamp: Utc::now(),
            version,
            reason: reason.into(),
            data,
            checksum,
        }
    }

    /// The storage key this snapshot persists under, embedding the UTC
    /// creation date and the id so snapshots are self-describing on disk.
    pub fn storage_key(&self) -> String {
        format!("snapshot_{}_{}.json", self.timestamp.date_naive(), self.id)
    }

    /// Recomputes the checksum of `data` and compares it to the stored
    /// one. A mismatch means the stored state was corrupted and must
    /// never be trusted.
    pub fn verify_integrity(&self) -> Result<()> {
        let computed = checksum_of(&self.data);
        if computed != self.checksum {
            return Err(StoreError::Integrity {
                id: self.id.to_string(),
                stored: self.checksum.clone(),
                computed,
            });
        }
        Ok(())
    }
}

/// Deterministic SHA-256 digest of a JSON value, lower-hex encoded.
///
/// `serde_json` serializes object keys in sorted order, so the digest is
/// stable across capture and re-read.
pub fn checksum_of(data: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// A snapshot catalog entry, derived from the storage key naming
/// convention without loading the snapshot body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInfo {
    /// The snapshot's id.
    pub id: SnapshotId,

    /// The UTC calendar day embedded in the storage key.
    pub date: NaiveDate,

    /// The full storage key.
    pub storage_key: String,
}

impl SnapshotInfo {
    /// Parses a storage key of the form `snapshot_<date>_<id>.json`.
    ///
    /// Returns None for keys that do not follow the convention, so
    /// unrelated files sharing the storage area are skipped rather than
    /// treated as errors.
    pub fn parse_key(key: &str) -> Option<Self> {
        let stem = key.strip_prefix("snapshot_")?.strip_suffix(".json")?;
        let (date, id) = stem.split_once('_')?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        let id = SnapshotId::parse(id).ok()?;
        Some(Self {
            id,
            date,
            storage_key: key.to_string(),
        })
    }
}
