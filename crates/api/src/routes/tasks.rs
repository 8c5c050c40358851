//! Task CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use domain::{Task, TaskUpdate};
use event_store::HistoryStore;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::request_metadata;

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub message: &'static str,
}

/// GET /tasks — lists all tasks.
pub async fn list<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.tasks.list().await?))
}

/// POST /tasks — creates a task.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state
        .tasks
        .create(req.text, request_metadata(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// PUT /tasks/{id} — applies a partial update.
#[tracing::instrument(skip(state, headers, update))]
pub async fn update<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(update): Json<TaskUpdate>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .tasks
        .update(id, update, request_metadata(&headers))
        .await?;
    Ok(Json(task))
}

/// DELETE /tasks/{id} — removes a task.
#[tracing::instrument(skip(state, headers))]
pub async fn remove<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.tasks.delete(id, request_metadata(&headers)).await?;
    Ok(Json(DeletedResponse {
        message: "Task deleted successfully",
    }))
}
