//! Pure aggregation over the audit event log.
//!
//! [`aggregate`] is a deterministic function of an event sequence with no
//! I/O: the facade filters a window of the log and hands it here. It is
//! total on the empty sequence: every count is zero and every map empty.

pub mod report;

pub use report::{AnalyticsReport, ShoppingStats, TaskCompletionStats};

use event_store::Event;

const TASK_CREATED: &str = "task_created";
const TASK_COMPLETED: &str = "task_completed";
const SHOPPING_ITEM_CREATED: &str = "shopping_item_created";
const SHOPPING_ITEM_PURCHASED: &str = "shopping_item_purchased";
const SHOPPING_ITEM_DELETED: &str = "shopping_item_deleted";

/// Aggregates an event sequence into derived metrics.
///
/// Counts events per type and per UTC calendar day, then computes task
/// and shopping completion statistics. Task completion latency pairs each
/// `task_completed` event with the *first* `task_created` event in
/// sequence order whose payload `id` matches; completions with no
/// matching creation (truncated history) are skipped. When an entity id
/// is reused after deletion, first-match-wins can misattribute the
/// latency to the earlier creation; that limitation is carried over
/// deliberately rather than silently corrected.
pub fn aggregate(events: &[Event]) -> AnalyticsReport {
    let mut report = AnalyticsReport::default();

    for event in events {
        *report
            .event_type_counts
            .entry(event.event_type.clone())
            .or_insert(0) += 1;
        *report
            .daily_activity
            .entry(event.timestamp.date_naive())
            .or_insert(0) += 1;
    }

    let created: Vec<&Event> = events
        .iter()
        .filter(|e| e.event_type == TASK_CREATED)
        .collect();
    let completed: Vec<&Event> = events
        .iter()
        .filter(|e| e.event_type == TASK_COMPLETED)
        .collect();

    report.task_stats.total_created = created.len() as u64;
    report.task_stats.total_completed = completed.len() as u64;

    let mut latencies_ms = Vec::new();
    for completion in &completed {
        let Some(entity_id) = completion.data.get("id") else {
            continue;
        };
        if let Some(creation) = created.iter().find(|e| e.data.get("id") == Some(entity_id)) {
            let delta = completion.timestamp - creation.timestamp;
            latencies_ms.push(delta.num_milliseconds());
        }
    }
    if !latencies_ms.is_empty() {
        report.task_stats.average_completion_time =
            latencies_ms.iter().sum::<i64>() as f64 / latencies_ms.len() as f64;
    }

    report.shopping_stats.total_created = count_of(events, SHOPPING_ITEM_CREATED);
    report.shopping_stats.total_purchased = count_of(events, SHOPPING_ITEM_PURCHASED);
    report.shopping_stats.total_deleted = count_of(events, SHOPPING_ITEM_DELETED);

    report
}

fn count_of(events: &[Event], event_type: &str) -> u64 {
    events.iter().filter(|e| e.event_type == event_type).count() as u64
}
