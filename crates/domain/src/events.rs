//! The fixed audit event vocabulary.

use serde::{Deserialize, Serialize};

/// Every event type the planner records.
///
/// The wire form is the snake_case tag (`task_created`, ...). Entity
/// lifecycle kinds are recorded once per domain mutation; the last five
/// are lifecycle markers recorded by the server and the migration hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskCreated,
    TaskCompleted,
    TaskUncompleted,
    TaskUpdated,
    TaskDeleted,
    ShoppingItemCreated,
    ShoppingItemPurchased,
    ShoppingItemUnpurchased,
    ShoppingItemUpdated,
    ShoppingItemDeleted,
    TimeblockCreated,
    TimeblockCompleted,
    TimeblockUncompleted,
    TimeblockUpdated,
    TimeblockDeleted,
    ServerStarted,
    DataMigration,
    DataMigrationCompleted,
    DataMigrationFailed,
    SnapshotCreated,
}

impl EventKind {
    /// Returns the wire tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TaskCreated => "task_created",
            EventKind::TaskCompleted => "task_completed",
            EventKind::TaskUncompleted => "task_uncompleted",
            EventKind::TaskUpdated => "task_updated",
            EventKind::TaskDeleted => "task_deleted",
            EventKind::ShoppingItemCreated => "shopping_item_created",
            EventKind::ShoppingItemPurchased => "shopping_item_purchased",
            EventKind::ShoppingItemUnpurchased => "shopping_item_unpurchased",
            EventKind::ShoppingItemUpdated => "shopping_item_updated",
            EventKind::ShoppingItemDeleted => "shopping_item_deleted",
            EventKind::TimeblockCreated => "timeblock_created",
            EventKind::TimeblockCompleted => "timeblock_completed",
            EventKind::TimeblockUncompleted => "timeblock_uncompleted",
            EventKind::TimeblockUpdated => "timeblock_updated",
            EventKind::TimeblockDeleted => "timeblock_deleted",
            EventKind::ServerStarted => "server_started",
            EventKind::DataMigration => "data_migration",
            EventKind::DataMigrationCompleted => "data_migration_completed",
            EventKind::DataMigrationFailed => "data_migration_failed",
            EventKind::SnapshotCreated => "snapshot_created",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_tag_matches_serde_form() {
        for kind in [
            EventKind::TaskCreated,
            EventKind::ShoppingItemUnpurchased,
            EventKind::TimeblockUpdated,
            EventKind::DataMigrationFailed,
            EventKind::SnapshotCreated,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn display_is_the_wire_tag() {
        assert_eq!(EventKind::TaskCompleted.to_string(), "task_completed");
        assert_eq!(EventKind::ServerStarted.to_string(), "server_started");
    }
}
