//! Time block CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use domain::{TimeBlock, TimeBlockUpdate};
use event_store::HistoryStore;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::request_metadata;
use crate::routes::tasks::DeletedResponse;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlockRequest {
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// GET /timeblocks — lists all blocks.
pub async fn list<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<TimeBlock>>, ApiError> {
    Ok(Json(state.timeblocks.list().await?))
}

/// POST /timeblocks — creates a block.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateBlockRequest>,
) -> Result<(StatusCode, Json<TimeBlock>), ApiError> {
    let block = state
        .timeblocks
        .create(req.title, req.start_time, req.end_time, request_metadata(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(block)))
}

/// PUT /timeblocks/{id} — applies a partial update.
#[tracing::instrument(skip(state, headers, update))]
pub async fn update<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(update): Json<TimeBlockUpdate>,
) -> Result<Json<TimeBlock>, ApiError> {
    let block = state
        .timeblocks
        .update(id, update, request_metadata(&headers))
        .await?;
    Ok(Json(block))
}

/// DELETE /timeblocks/{id} — removes a block.
#[tracing::instrument(skip(state, headers))]
pub async fn remove<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.timeblocks.delete(id, request_metadata(&headers)).await?;
    Ok(Json(DeletedResponse {
        message: "Time block deleted successfully",
    }))
}
