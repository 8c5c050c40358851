//! Shopping list items.

use chrono::{DateTime, Utc};
use event_store::{EventMetadata, HistoryStore};
use history::EventLog;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{DomainError, Result};
use crate::events::EventKind;
use crate::repository::{JsonCollection, next_entity_id};

/// An item on the shopping list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    pub id: i64,
    pub name: String,
    pub quantity: u32,
    pub purchased: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub purchased_at: Option<DateTime<Utc>>,
}

/// A typed partial update to a shopping item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchased: Option<bool>,
}

impl ShoppingItemUpdate {
    /// The event kind this update records.
    pub fn event_kind(&self) -> EventKind {
        match self.purchased {
            Some(true) => EventKind::ShoppingItemPurchased,
            Some(false) => EventKind::ShoppingItemUnpurchased,
            None => EventKind::ShoppingItemUpdated,
        }
    }
}

impl ShoppingItem {
    /// Applies a partial update in place; toggling `purchased` sets or
    /// clears the derived `purchased_at` timestamp.
    pub fn apply_update(&mut self, update: &ShoppingItemUpdate, now: DateTime<Utc>) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(quantity) = update.quantity {
            self.quantity = quantity;
        }
        if let Some(purchased) = update.purchased {
            self.purchased = purchased;
            self.purchased_at = purchased.then_some(now);
        }
    }
}

/// CRUD over shopping items, recording one audit event per mutation.
#[derive(Clone)]
pub struct ShoppingService<S: HistoryStore> {
    items: JsonCollection<ShoppingItem>,
    log: EventLog<S>,
}

impl<S: HistoryStore + Clone> ShoppingService<S> {
    pub fn new(items: JsonCollection<ShoppingItem>, log: EventLog<S>) -> Self {
        Self { items, log }
    }

    /// Returns the item collection.
    pub fn collection(&self) -> &JsonCollection<ShoppingItem> {
        &self.items
    }

    /// Lists all current items.
    pub async fn list(&self) -> Result<Vec<ShoppingItem>> {
        self.items.read().await
    }

    /// Creates an item and records `shopping_item_created`. Quantity
    /// defaults to 1 when the caller passes none.
    #[tracing::instrument(skip(self, metadata))]
    pub async fn create(
        &self,
        name: String,
        quantity: Option<u32>,
        metadata: EventMetadata,
    ) -> Result<ShoppingItem> {
        let now = Utc::now();
        let item = self
            .items
            .mutate(|items| {
                let id = next_entity_id(items.iter().map(|i| i.id).max(), now.timestamp_millis());
                let item = ShoppingItem {
                    id,
                    name: name.clone(),
                    quantity: quantity.unwrap_or(1),
                    purchased: false,
                    created_at: now,
                    purchased_at: None,
                };
                items.push(item.clone());
                Some(item)
            })
            .await?
            .expect("push mutation always yields an item");

        self.log
            .record(
                EventKind::ShoppingItemCreated.as_str(),
                serde_json::to_value(&item)?,
                metadata,
            )
            .await?;
        Ok(item)
    }

    /// Applies a partial update and records the matching event kind.
    #[tracing::instrument(skip(self, update, metadata))]
    pub async fn update(
        &self,
        id: i64,
        update: ShoppingItemUpdate,
        metadata: EventMetadata,
    ) -> Result<ShoppingItem> {
        let now = Utc::now();
        let outcome = self
            .items
            .mutate(|items| {
                let item = items.iter_mut().find(|i| i.id == id)?;
                let old = item.clone();
                item.apply_update(&update, now);
                Some((old, item.clone()))
            })
            .await?;

        let (old, new) = outcome.ok_or(DomainError::NotFound { resource: "shopping item", id })?;

        self.log
            .record(
                update.event_kind().as_str(),
                json!({"id": id, "oldData": old, "newData": new, "changes": update}),
                metadata,
            )
            .await?;
        Ok(new)
    }

    /// Deletes an item and records `shopping_item_deleted`.
    #[tracing::instrument(skip(self, metadata))]
    pub async fn delete(&self, id: i64, metadata: EventMetadata) -> Result<ShoppingItem> {
        let outcome = self
            .items
            .mutate(|items| {
                let index = items.iter().position(|i| i.id == id)?;
                Some(items.remove(index))
            })
            .await?;

        let item = outcome.ok_or(DomainError::NotFound { resource: "shopping item", id })?;

        self.log
            .record(
                EventKind::ShoppingItemDeleted.as_str(),
                json!({"id": id, "deletedItem": item}),
                metadata,
            )
            .await?;
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::InMemoryStore;
    use tempfile::TempDir;

    fn service() -> (ShoppingService<InMemoryStore>, EventLog<InMemoryStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(InMemoryStore::new());
        let items = JsonCollection::new(dir.path().join("shopping.json"));
        (ShoppingService::new(items, log.clone()), log, dir)
    }

    #[tokio::test]
    async fn create_defaults_quantity_to_one() {
        let (svc, log, _dir) = service();

        let item = svc.create("milk".into(), None, EventMetadata::new()).await.unwrap();
        assert_eq!(item.quantity, 1);
        assert!(!item.purchased);

        let events = log.read_all().await.unwrap();
        assert_eq!(events[0].event_type, "shopping_item_created");
        assert_eq!(events[0].data["name"], "milk");
    }

    #[tokio::test]
    async fn purchase_toggle_drives_event_kind_and_timestamp() {
        let (svc, log, _dir) = service();
        let item = svc.create("milk".into(), Some(2), EventMetadata::new()).await.unwrap();

        let bought = svc
            .update(
                item.id,
                ShoppingItemUpdate { purchased: Some(true), ..Default::default() },
                EventMetadata::new(),
            )
            .await
            .unwrap();
        assert!(bought.purchased_at.is_some());

        let returned = svc
            .update(
                item.id,
                ShoppingItemUpdate { purchased: Some(false), ..Default::default() },
                EventMetadata::new(),
            )
            .await
            .unwrap();
        assert!(returned.purchased_at.is_none());

        let types: Vec<_> = log
            .read_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(
            types,
            vec![
                "shopping_item_created",
                "shopping_item_purchased",
                "shopping_item_unpurchased"
            ]
        );
    }

    #[tokio::test]
    async fn quantity_update_records_plain_update() {
        let (svc, log, _dir) = service();
        let item = svc.create("eggs".into(), None, EventMetadata::new()).await.unwrap();

        let updated = svc
            .update(
                item.id,
                ShoppingItemUpdate { quantity: Some(12), ..Default::default() },
                EventMetadata::new(),
            )
            .await
            .unwrap();
        assert_eq!(updated.quantity, 12);

        let events = log.read_all().await.unwrap();
        assert_eq!(events[1].event_type, "shopping_item_updated");
    }

    #[tokio::test]
    async fn delete_unknown_item_is_not_found() {
        let (svc, _log, _dir) = service();
        let result = svc.delete(42, EventMetadata::new()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
