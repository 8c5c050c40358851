//! Derived metric types. Reports are computed on demand and never persisted.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Aggregate metrics derived from a filtered window of the event log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    /// Number of events per type tag.
    pub event_type_counts: BTreeMap<String, u64>,

    /// Number of events per UTC calendar day.
    pub daily_activity: BTreeMap<NaiveDate, u64>,

    /// Task creation/completion statistics.
    #[serde(rename = "taskCompletionStats")]
    pub task_stats: TaskCompletionStats,

    /// Shopping list statistics.
    pub shopping_stats: ShoppingStats,
}

/// Task lifecycle statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompletionStats {
    /// Count of task-creation events in the window.
    pub total_created: u64,

    /// Count of task-completion events in the window.
    pub total_completed: u64,

    /// Mean creation-to-completion latency in milliseconds over the
    /// matched pairs, or 0 when no pair matched.
    pub average_completion_time: f64,
}

/// Shopping list lifecycle statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingStats {
    /// Count of item-creation events in the window.
    pub total_created: u64,

    /// Count of item-purchase events in the window.
    pub total_purchased: u64,

    /// Count of item-deletion events in the window.
    pub total_deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_report_is_all_zero() {
        let report = AnalyticsReport::default();
        assert!(report.event_type_counts.is_empty());
        assert!(report.daily_activity.is_empty());
        assert_eq!(report.task_stats.total_created, 0);
        assert_eq!(report.shopping_stats.total_deleted, 0);
    }

    #[test]
    fn report_roundtrips_through_json() {
        let mut report = AnalyticsReport::default();
        report.event_type_counts.insert("task_created".into(), 3);
        report.task_stats.average_completion_time = 1500.5;

        let json = serde_json::to_string(&report).unwrap();
        let back: AnalyticsReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
