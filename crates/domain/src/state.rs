//! Current-state provider for snapshots.

use async_trait::async_trait;
use history::StateProvider;
use serde_json::json;

use crate::repository::JsonCollection;
use crate::shopping::ShoppingItem;
use crate::task::Task;
use crate::timeblock::TimeBlock;

/// Assembles the full planner state from the three current-state
/// collections, for daily snapshots and migration backups.
#[derive(Clone)]
pub struct PlannerStateProvider {
    tasks: JsonCollection<Task>,
    shopping: JsonCollection<ShoppingItem>,
    timeblocks: JsonCollection<TimeBlock>,
}

impl PlannerStateProvider {
    pub fn new(
        tasks: JsonCollection<Task>,
        shopping: JsonCollection<ShoppingItem>,
        timeblocks: JsonCollection<TimeBlock>,
    ) -> Self {
        Self {
            tasks,
            shopping,
            timeblocks,
        }
    }
}

#[async_trait]
impl StateProvider for PlannerStateProvider {
    async fn current_state(
        &self,
    ) -> std::result::Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>> {
        let tasks = self.tasks.read().await?;
        let shopping = self.shopping.read().await?;
        let timeblocks = self.timeblocks.read().await?;

        Ok(json!({
            "tasks": tasks,
            "shoppingItems": shopping,
            "timeBlocks": timeblocks,
        }))
    }
}
