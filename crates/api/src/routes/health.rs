//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use event_store::HistoryStore;
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub tasks_count: usize,
    pub shopping_items_count: usize,
    pub time_blocks_count: usize,
    pub events_count: usize,
}

/// GET /health — exercises the state files and the event log and reports
/// per-resource counts.
pub async fn check<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<HealthResponse>, ApiError> {
    let tasks = state.tasks.list().await?;
    let shopping = state.shopping.list().await?;
    let timeblocks = state.timeblocks.list().await?;
    let events = state.history.log().read_all().await?;

    Ok(Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        version: state.history.log().schema_version().await.to_string(),
        tasks_count: tasks.len(),
        shopping_items_count: shopping.len(),
        time_blocks_count: timeblocks.len(),
        events_count: events.len(),
    }))
}
