use chrono::{DateTime, Utc};

use crate::Event;

/// Builder for filtering the event log.
///
/// All filters are optional and combine with logical AND. Timestamp
/// bounds are inclusive on both ends.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Filter by event types (any of these types).
    pub event_types: Option<Vec<String>>,

    /// Filter to events at or after this timestamp.
    pub from: Option<DateTime<Utc>>,

    /// Filter to events at or before this timestamp.
    pub to: Option<DateTime<Utc>>,

    /// Maximum number of events to return.
    pub limit: Option<usize>,

    /// Number of events to skip.
    pub offset: Option<usize>,
}

impl EventQuery {
    /// Creates a new empty query matching every event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for events of a single type.
    pub fn for_type(event_type: impl Into<String>) -> Self {
        Self {
            event_types: Some(vec![event_type.into()]),
            ..Default::default()
        }
    }

    /// Filters by event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types = Some(vec![event_type.into()]);
        self
    }

    /// Filters by multiple event types (any of these).
    pub fn event_types(mut self, event_types: Vec<String>) -> Self {
        self.event_types = Some(event_types);
        self
    }

    /// Filters to events at or after this timestamp.
    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Filters to events at or before this timestamp.
    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    /// Limits the number of events returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many events before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Whether an event passes the type and timestamp filters.
    ///
    /// Limit and offset are windowing, not matching, and are ignored here.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref types) = self.event_types
            && !types.contains(&event.event_type)
        {
            return false;
        }
        if let Some(from) = self.from
            && event.timestamp < from
        {
            return false;
        }
        if let Some(to) = self.to
            && event.timestamp > to
        {
            return false;
        }
        true
    }
}
