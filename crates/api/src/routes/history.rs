//! History query, export, and snapshot endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use common::SnapshotId;
use event_store::{HistoryStore, Snapshot, SnapshotInfo};
use history::{AnalysisExport, EventPage, ExportFormat};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::request_metadata;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsParams {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsParams {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Comma-separated type allow-list.
    pub event_types: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportParams {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub event_types: Option<String>,
    pub format: Option<ExportFormat>,
}

#[derive(Deserialize)]
pub struct CreateSnapshotRequest {
    pub reason: Option<String>,
}

fn split_types(param: Option<String>) -> Option<Vec<String>> {
    param.map(|types| {
        types
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    })
}

/// GET /history/events — one page of the log, with the unlimited total.
pub async fn events<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<EventsParams>,
) -> Result<Json<EventPage>, ApiError> {
    let page = state
        .history
        .events_page(
            params.event_type.as_deref(),
            params.start_date,
            params.end_date,
            params.limit,
        )
        .await?;
    Ok(Json(page))
}

/// GET /history/analytics — filtered events plus their aggregate metrics.
pub async fn analytics<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<AnalyticsParams>,
) -> Result<Json<AnalysisExport>, ApiError> {
    let export = state
        .history
        .export_for_analysis(
            params.start_date,
            params.end_date,
            split_types(params.event_types),
        )
        .await?;
    Ok(Json(export))
}

/// GET /history/export — serialized export, JSON by default or CSV.
pub async fn export<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ExportParams>,
) -> Result<impl IntoResponse, ApiError> {
    let format = params.format.unwrap_or(ExportFormat::Json);
    let body = state
        .history
        .export_formatted(
            params.start_date,
            params.end_date,
            split_types(params.event_types),
            format,
        )
        .await?;

    let content_type = match format {
        ExportFormat::Json => "application/json",
        ExportFormat::Csv => "text/csv; charset=utf-8",
    };
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body))
}

/// POST /history/snapshots — captures the current state.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create_snapshot<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateSnapshotRequest>,
) -> Result<(StatusCode, Json<Snapshot>), ApiError> {
    let reason = req.reason.unwrap_or_else(|| "manual".to_string());
    let snapshot = state
        .history
        .snapshot_current_state(&reason, request_metadata(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /history/snapshots — lists the stored snapshots.
pub async fn list_snapshots<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<SnapshotInfo>>, ApiError> {
    Ok(Json(state.history.list_snapshots().await?))
}

/// GET /history/snapshots/{id} — loads one snapshot, checksum-verified.
pub async fn read_snapshot<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Snapshot>, ApiError> {
    let id = SnapshotId::parse(&id)
        .map_err(|e| ApiError::BadRequest(format!("invalid snapshot id: {e}")))?;
    Ok(Json(state.history.read_snapshot(id).await?))
}
