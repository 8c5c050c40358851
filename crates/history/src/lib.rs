//! History query facade for the daykeeper audit trail.
//!
//! This crate combines the pieces below into the surface the HTTP layer
//! and domain services consume:
//! - [`EventLog`]: records one audit event per domain mutation
//! - [`SnapshotManager`]: checksum-verified point-in-time captures,
//!   including the once-per-day automatic snapshot
//! - [`HistoryService`]: filtered exports (JSON/CSV), pagination, and
//!   the version-stamped migration hook

pub mod error;
pub mod export;
pub mod log;
pub mod service;
pub mod snapshots;

pub use error::{HistoryError, Result};
pub use export::{AnalysisExport, EventPage, ExportDateRange, ExportFormat, ExportMetadata};
pub use log::EventLog;
pub use service::{DEFAULT_PAGE_LIMIT, HistoryService};
pub use snapshots::{SnapshotManager, StateProvider};
