use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{EventId, SchemaVersion};
use serde::{Deserialize, Serialize};

/// Request-scoped context attached to every audit event.
///
/// The three fixed fields are always present and default to `"unknown"`
/// when the caller has nothing better; anything else a caller wants to
/// carry rides in `extra` and is flattened onto the wire alongside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// User agent of the request that caused the event.
    #[serde(rename = "userAgent", default = "unknown")]
    pub user_agent: String,

    /// Peer address of the request.
    #[serde(default = "unknown")]
    pub ip: String,

    /// Session the request belonged to.
    #[serde(rename = "sessionId", default = "unknown")]
    pub session_id: String,

    /// Forward-compatible extension attributes.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn unknown() -> String {
    "unknown".to_string()
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self {
            user_agent: unknown(),
            ip: unknown(),
            session_id: unknown(),
            extra: HashMap::new(),
        }
    }
}

impl EventMetadata {
    /// Creates metadata with all fixed fields at their `"unknown"` defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the peer address.
    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = ip.into();
        self
    }

    /// Sets the session id.
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Adds an extension attribute.
    pub fn extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// One immutable record of a state-changing action.
///
/// Events are append-only: once stored they are never mutated or deleted
/// except by a whole-store rebuild. Ordering is append order, which is not
/// necessarily timestamp order under concurrent writers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event.
    pub id: EventId,

    /// The type tag (e.g. "task_created", "shopping_item_purchased").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event was recorded, UTC.
    pub timestamp: DateTime<Utc>,

    /// The event payload as JSON.
    pub data: serde_json::Value,

    /// Schema version the event was written under.
    pub version: SchemaVersion,

    /// Request context the event was recorded with.
    pub metadata: EventMetadata,
}

impl Event {
    /// Creates a new event builder.
    pub fn builder() -> EventBuilder {
        EventBuilder::default()
    }
}

/// Builder for constructing events.
#[derive(Debug, Default)]
pub struct EventBuilder {
    id: Option<EventId>,
    event_type: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    data: Option<serde_json::Value>,
    version: Option<SchemaVersion>,
    metadata: Option<EventMetadata>,
}

impl EventBuilder {
    /// Sets the event ID. If not set, a fresh random ID is generated.
    pub fn id(mut self, id: EventId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the event type tag.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the timestamp. If not set, the current time is used.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn data<T: Serialize>(mut self, data: &T) -> Result<Self, serde_json::Error> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn data_raw(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets the schema version. If not set, the current version is stamped.
    pub fn version(mut self, version: SchemaVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Sets the metadata. If not set, all fields default to `"unknown"`.
    pub fn metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Builds the event.
    ///
    /// # Panics
    ///
    /// Panics if `event_type` or `data` is not set.
    pub fn build(self) -> Event {
        Event {
            id: self.id.unwrap_or_default(),
            event_type: self.event_type.expect("event_type is required"),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            data: self.data.expect("data is required"),
            version: self.version.unwrap_or_default(),
            metadata: self.metadata.unwrap_or_default(),
        }
    }

    /// Tries to build the event, returning None if required fields are missing.
    pub fn try_build(self) -> Option<Event> {
        Some(Event {
            id: self.id.unwrap_or_default(),
            event_type: self.event_type?,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            data: self.data?,
            version: self.version.unwrap_or_default(),
            metadata: self.metadata.unwrap_or_default(),
        })
    }
}
