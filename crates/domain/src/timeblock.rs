//! Time blocks: scheduled chunks of the day.

use chrono::{DateTime, Utc};
use event_store::{EventMetadata, HistoryStore};
use history::EventLog;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{DomainError, Result};
use crate::events::EventKind;
use crate::repository::{JsonCollection, next_entity_id};

/// A scheduled block of time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlock {
    pub id: i64,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A typed partial update to a time block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlockUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TimeBlockUpdate {
    /// The event kind this update records.
    pub fn event_kind(&self) -> EventKind {
        match self.completed {
            Some(true) => EventKind::TimeblockCompleted,
            Some(false) => EventKind::TimeblockUncompleted,
            None => EventKind::TimeblockUpdated,
        }
    }
}

impl TimeBlock {
    /// Applies a partial update in place; toggling `completed` sets or
    /// clears the derived `completed_at` timestamp.
    pub fn apply_update(&mut self, update: &TimeBlockUpdate, now: DateTime<Utc>) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(start_time) = update.start_time {
            self.start_time = start_time;
        }
        if let Some(end_time) = update.end_time {
            self.end_time = end_time;
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
            self.completed_at = completed.then_some(now);
        }
    }
}

/// CRUD over time blocks, recording one audit event per mutation.
#[derive(Clone)]
pub struct TimeBlockService<S: HistoryStore> {
    blocks: JsonCollection<TimeBlock>,
    log: EventLog<S>,
}

impl<S: HistoryStore + Clone> TimeBlockService<S> {
    pub fn new(blocks: JsonCollection<TimeBlock>, log: EventLog<S>) -> Self {
        Self { blocks, log }
    }

    /// Returns the block collection.
    pub fn collection(&self) -> &JsonCollection<TimeBlock> {
        &self.blocks
    }

    /// Lists all current blocks.
    pub async fn list(&self) -> Result<Vec<TimeBlock>> {
        self.blocks.read().await
    }

    /// Creates a block and records `timeblock_created`.
    #[tracing::instrument(skip(self, metadata))]
    pub async fn create(
        &self,
        title: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        metadata: EventMetadata,
    ) -> Result<TimeBlock> {
        let now = Utc::now();
        let block = self
            .blocks
            .mutate(|blocks| {
                let id = next_entity_id(blocks.iter().map(|b| b.id).max(), now.timestamp_millis());
                let block = TimeBlock {
                    id,
                    title: title.clone(),
                    start_time,
                    end_time,
                    completed: false,
                    created_at: now,
                    completed_at: None,
                };
                blocks.push(block.clone());
                Some(block)
            })
            .await?
            .expect("push mutation always yields a block");

        self.log
            .record(
                EventKind::TimeblockCreated.as_str(),
                serde_json::to_value(&block)?,
                metadata,
            )
            .await?;
        Ok(block)
    }

    /// Applies a partial update and records the matching event kind.
    #[tracing::instrument(skip(self, update, metadata))]
    pub async fn update(
        &self,
        id: i64,
        update: TimeBlockUpdate,
        metadata: EventMetadata,
    ) -> Result<TimeBlock> {
        let now = Utc::now();
        let outcome = self
            .blocks
            .mutate(|blocks| {
                let block = blocks.iter_mut().find(|b| b.id == id)?;
                let old = block.clone();
                block.apply_update(&update, now);
                Some((old, block.clone()))
            })
            .await?;

        let (old, new) = outcome.ok_or(DomainError::NotFound { resource: "time block", id })?;

        self.log
            .record(
                update.event_kind().as_str(),
                json!({"id": id, "oldData": old, "newData": new, "changes": update}),
                metadata,
            )
            .await?;
        Ok(new)
    }

    /// Deletes a block and records `timeblock_deleted`.
    #[tracing::instrument(skip(self, metadata))]
    pub async fn delete(&self, id: i64, metadata: EventMetadata) -> Result<TimeBlock> {
        let outcome = self
            .blocks
            .mutate(|blocks| {
                let index = blocks.iter().position(|b| b.id == id)?;
                Some(blocks.remove(index))
            })
            .await?;

        let block = outcome.ok_or(DomainError::NotFound { resource: "time block", id })?;

        self.log
            .record(
                EventKind::TimeblockDeleted.as_str(),
                json!({"id": id, "deletedBlock": block}),
                metadata,
            )
            .await?;
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use event_store::InMemoryStore;
    use tempfile::TempDir;

    fn service() -> (TimeBlockService<InMemoryStore>, EventLog<InMemoryStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(InMemoryStore::new());
        let blocks = JsonCollection::new(dir.path().join("timeblocks.json"));
        (TimeBlockService::new(blocks, log.clone()), log, dir)
    }

    #[tokio::test]
    async fn create_records_timeblock_created() {
        let (svc, log, _dir) = service();
        let start = Utc::now();

        let block = svc
            .create("deep work".into(), start, start + Duration::hours(2), EventMetadata::new())
            .await
            .unwrap();
        assert!(!block.completed);

        let events = log.read_all().await.unwrap();
        assert_eq!(events[0].event_type, "timeblock_created");
        assert_eq!(events[0].data["title"], "deep work");
    }

    #[tokio::test]
    async fn completion_toggle_and_reschedule() {
        let (svc, log, _dir) = service();
        let start = Utc::now();
        let block = svc
            .create("review".into(), start, start + Duration::hours(1), EventMetadata::new())
            .await
            .unwrap();

        let done = svc
            .update(
                block.id,
                TimeBlockUpdate { completed: Some(true), ..Default::default() },
                EventMetadata::new(),
            )
            .await
            .unwrap();
        assert!(done.completed_at.is_some());

        let moved = svc
            .update(
                block.id,
                TimeBlockUpdate {
                    start_time: Some(start + Duration::hours(3)),
                    end_time: Some(start + Duration::hours(4)),
                    ..Default::default()
                },
                EventMetadata::new(),
            )
            .await
            .unwrap();
        assert_eq!(moved.start_time, start + Duration::hours(3));

        let types: Vec<_> = log
            .read_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(
            types,
            vec!["timeblock_created", "timeblock_completed", "timeblock_updated"]
        );
    }

    #[tokio::test]
    async fn delete_records_deleted_block_payload() {
        let (svc, log, _dir) = service();
        let start = Utc::now();
        let block = svc
            .create("standup".into(), start, start + Duration::minutes(15), EventMetadata::new())
            .await
            .unwrap();

        svc.delete(block.id, EventMetadata::new()).await.unwrap();
        assert!(svc.list().await.unwrap().is_empty());

        let events = log.read_all().await.unwrap();
        assert_eq!(events[1].event_type, "timeblock_deleted");
        assert_eq!(events[1].data["deletedBlock"]["title"], "standup");
    }
}
