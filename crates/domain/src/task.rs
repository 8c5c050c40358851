//! Tasks: the to-do list resource.

use chrono::{DateTime, Utc};
use event_store::{EventMetadata, HistoryStore};
use history::EventLog;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{DomainError, Result};
use crate::events::EventKind;
use crate::repository::{JsonCollection, next_entity_id};

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A typed partial update to a task.
///
/// Only the enumerated fields are updatable; absent fields are left
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskUpdate {
    /// The event kind this update records: toggling `completed` is a
    /// completion/uncompletion, anything else a plain update.
    pub fn event_kind(&self) -> EventKind {
        match self.completed {
            Some(true) => EventKind::TaskCompleted,
            Some(false) => EventKind::TaskUncompleted,
            None => EventKind::TaskUpdated,
        }
    }
}

impl Task {
    /// Applies a partial update in place.
    ///
    /// Updating `completed` also sets or clears the derived
    /// `completed_at` timestamp; no other field touches it.
    pub fn apply_update(&mut self, update: &TaskUpdate, now: DateTime<Utc>) {
        if let Some(text) = &update.text {
            self.text = text.clone();
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
            self.completed_at = completed.then_some(now);
        }
    }
}

/// CRUD over tasks, recording one audit event per mutation.
#[derive(Clone)]
pub struct TaskService<S: HistoryStore> {
    tasks: JsonCollection<Task>,
    log: EventLog<S>,
}

impl<S: HistoryStore + Clone> TaskService<S> {
    pub fn new(tasks: JsonCollection<Task>, log: EventLog<S>) -> Self {
        Self { tasks, log }
    }

    /// Returns the task collection.
    pub fn collection(&self) -> &JsonCollection<Task> {
        &self.tasks
    }

    /// Lists all current tasks.
    pub async fn list(&self) -> Result<Vec<Task>> {
        self.tasks.read().await
    }

    /// Creates a task and records `task_created`.
    #[tracing::instrument(skip(self, metadata))]
    pub async fn create(&self, text: String, metadata: EventMetadata) -> Result<Task> {
        let now = Utc::now();
        let task = self
            .tasks
            .mutate(|tasks| {
                let id = next_entity_id(tasks.iter().map(|t| t.id).max(), now.timestamp_millis());
                let task = Task {
                    id,
                    text: text.clone(),
                    completed: false,
                    created_at: now,
                    completed_at: None,
                };
                tasks.push(task.clone());
                Some(task)
            })
            .await?
            .expect("push mutation always yields a task");

        self.log
            .record(
                EventKind::TaskCreated.as_str(),
                serde_json::to_value(&task)?,
                metadata,
            )
            .await?;
        Ok(task)
    }

    /// Applies a partial update and records the matching event kind.
    #[tracing::instrument(skip(self, update, metadata))]
    pub async fn update(&self, id: i64, update: TaskUpdate, metadata: EventMetadata) -> Result<Task> {
        let now = Utc::now();
        let outcome = self
            .tasks
            .mutate(|tasks| {
                let task = tasks.iter_mut().find(|t| t.id == id)?;
                let old = task.clone();
                task.apply_update(&update, now);
                Some((old, task.clone()))
            })
            .await?;

        let (old, new) = outcome.ok_or(DomainError::NotFound { resource: "task", id })?;

        self.log
            .record(
                update.event_kind().as_str(),
                json!({"id": id, "oldData": old, "newData": new, "changes": update}),
                metadata,
            )
            .await?;
        Ok(new)
    }

    /// Deletes a task and records `task_deleted`.
    #[tracing::instrument(skip(self, metadata))]
    pub async fn delete(&self, id: i64, metadata: EventMetadata) -> Result<Task> {
        let outcome = self
            .tasks
            .mutate(|tasks| {
                let index = tasks.iter().position(|t| t.id == id)?;
                Some(tasks.remove(index))
            })
            .await?;

        let task = outcome.ok_or(DomainError::NotFound { resource: "task", id })?;

        self.log
            .record(
                EventKind::TaskDeleted.as_str(),
                json!({"id": id, "deletedTask": task}),
                metadata,
            )
            .await?;
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::InMemoryStore;
    use tempfile::TempDir;

    fn service() -> (TaskService<InMemoryStore>, EventLog<InMemoryStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(InMemoryStore::new());
        let tasks = JsonCollection::new(dir.path().join("tasks.json"));
        (TaskService::new(tasks, log.clone()), log, dir)
    }

    #[tokio::test]
    async fn create_persists_and_records_event() {
        let (svc, log, _dir) = service();

        let task = svc
            .create("water plants".into(), EventMetadata::new())
            .await
            .unwrap();
        assert!(!task.completed);
        assert!(task.completed_at.is_none());

        assert_eq!(svc.list().await.unwrap(), vec![task.clone()]);

        let events = log.read_all().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "task_created");
        assert_eq!(events[0].data["id"], task.id);
        assert_eq!(events[0].data["text"], "water plants");
    }

    #[tokio::test]
    async fn rapid_creates_get_distinct_ids() {
        let (svc, _log, _dir) = service();

        let a = svc.create("a".into(), EventMetadata::new()).await.unwrap();
        let b = svc.create("b".into(), EventMetadata::new()).await.unwrap();
        let c = svc.create("c".into(), EventMetadata::new()).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
    }

    #[tokio::test]
    async fn completing_sets_timestamp_and_records_task_completed() {
        let (svc, log, _dir) = service();
        let task = svc.create("t".into(), EventMetadata::new()).await.unwrap();

        let updated = svc
            .update(
                task.id,
                TaskUpdate { completed: Some(true), ..Default::default() },
                EventMetadata::new(),
            )
            .await
            .unwrap();

        assert!(updated.completed);
        assert!(updated.completed_at.is_some());

        let events = log.read_all().await.unwrap();
        assert_eq!(events[1].event_type, "task_completed");
        assert_eq!(events[1].data["changes"], serde_json::json!({"completed": true}));
        assert_eq!(events[1].data["oldData"]["completed"], false);
        assert_eq!(events[1].data["newData"]["completed"], true);
    }

    #[tokio::test]
    async fn uncompleting_clears_timestamp_and_records_task_uncompleted() {
        let (svc, log, _dir) = service();
        let task = svc.create("t".into(), EventMetadata::new()).await.unwrap();
        svc.update(
            task.id,
            TaskUpdate { completed: Some(true), ..Default::default() },
            EventMetadata::new(),
        )
        .await
        .unwrap();

        let updated = svc
            .update(
                task.id,
                TaskUpdate { completed: Some(false), ..Default::default() },
                EventMetadata::new(),
            )
            .await
            .unwrap();

        assert!(!updated.completed);
        assert!(updated.completed_at.is_none());

        let events = log.read_all().await.unwrap();
        assert_eq!(events[2].event_type, "task_uncompleted");
    }

    #[tokio::test]
    async fn text_only_update_records_task_updated_and_keeps_completed_at() {
        let (svc, log, _dir) = service();
        let task = svc.create("t".into(), EventMetadata::new()).await.unwrap();
        svc.update(
            task.id,
            TaskUpdate { completed: Some(true), ..Default::default() },
            EventMetadata::new(),
        )
        .await
        .unwrap();

        let updated = svc
            .update(
                task.id,
                TaskUpdate { text: Some("renamed".into()), ..Default::default() },
                EventMetadata::new(),
            )
            .await
            .unwrap();

        assert_eq!(updated.text, "renamed");
        assert!(updated.completed_at.is_some());

        let events = log.read_all().await.unwrap();
        assert_eq!(events[2].event_type, "task_updated");
    }

    #[tokio::test]
    async fn delete_removes_and_records_payload_with_deleted_task() {
        let (svc, log, _dir) = service();
        let task = svc.create("t".into(), EventMetadata::new()).await.unwrap();

        let deleted = svc.delete(task.id, EventMetadata::new()).await.unwrap();
        assert_eq!(deleted.id, task.id);
        assert!(svc.list().await.unwrap().is_empty());

        let events = log.read_all().await.unwrap();
        assert_eq!(events[1].event_type, "task_deleted");
        assert_eq!(events[1].data["deletedTask"]["id"], task.id);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found_and_records_nothing() {
        let (svc, log, _dir) = service();

        let result = svc
            .update(999, TaskUpdate::default(), EventMetadata::new())
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));

        let result = svc.delete(999, EventMetadata::new()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));

        assert!(log.read_all().await.unwrap().is_empty());
    }
}
