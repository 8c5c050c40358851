pub mod types;

pub use types::{EventId, SchemaVersion, SnapshotId};
