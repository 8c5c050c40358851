//! Export payload types and CSV rendering.

use analytics::AnalyticsReport;
use chrono::{DateTime, Utc};
use event_store::Event;
use serde::{Deserialize, Serialize};

/// Serialized output format for [`export_formatted`].
///
/// [`export_formatted`]: crate::HistoryService::export_formatted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

/// A filtered slice of the event log together with its aggregate metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisExport {
    pub metadata: ExportMetadata,
    pub events: Vec<Event>,
    pub analytics: AnalyticsReport,
}

/// Describes the effective query an export was produced with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    /// When the export was produced.
    pub exported_at: DateTime<Utc>,

    /// Number of events after filtering, before any serialization.
    pub total_events: usize,

    /// The effective date window; an omitted bound reads "all".
    pub date_range: ExportDateRange,

    /// The type allow-list, or the string "all" when none was given.
    pub event_types: serde_json::Value,
}

/// The effective date window of an export, bounds rendered as RFC 3339
/// strings or "all" when open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDateRange {
    pub start: String,
    pub end: String,
}

impl ExportDateRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self {
            start: bound_label(start),
            end: bound_label(end),
        }
    }
}

fn bound_label(bound: Option<DateTime<Utc>>) -> String {
    bound
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "all".to_string())
}

/// One page of the event log plus the count the limit was applied to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPage {
    pub events: Vec<Event>,

    /// The unlimited count of matching events; comparing against
    /// `events.len()` tells the caller whether the page was truncated.
    pub total: usize,

    /// The limit the page was cut to.
    pub limit: usize,
}

const CSV_HEADER: &str = "id,type,timestamp,data,version,userAgent,ip";

/// Renders events as CSV, one row per event.
pub(crate) fn to_csv(events: &[Event]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    for event in events {
        let fields = [
            event.id.to_string(),
            event.event_type.clone(),
            event.timestamp.to_rfc3339(),
            event.data.to_string(),
            event.version.to_string(),
            event.metadata.user_agent.clone(),
            event.metadata.ip.clone(),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

/// Quotes a field when it contains the delimiter, a quote, or a line
/// break; embedded quotes are doubled.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
