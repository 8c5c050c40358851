//! Shopping list CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use domain::{ShoppingItem, ShoppingItemUpdate};
use event_store::HistoryStore;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::request_metadata;
use crate::routes::tasks::DeletedResponse;

#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub quantity: Option<u32>,
}

/// GET /shopping — lists all items.
pub async fn list<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ShoppingItem>>, ApiError> {
    Ok(Json(state.shopping.list().await?))
}

/// POST /shopping — creates an item.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ShoppingItem>), ApiError> {
    let item = state
        .shopping
        .create(req.name, req.quantity, request_metadata(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /shopping/{id} — applies a partial update.
#[tracing::instrument(skip(state, headers, update))]
pub async fn update<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(update): Json<ShoppingItemUpdate>,
) -> Result<Json<ShoppingItem>, ApiError> {
    let item = state
        .shopping
        .update(id, update, request_metadata(&headers))
        .await?;
    Ok(Json(item))
}

/// DELETE /shopping/{id} — removes an item.
#[tracing::instrument(skip(state, headers))]
pub async fn remove<S: HistoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.shopping.delete(id, request_metadata(&headers)).await?;
    Ok(Json(DeletedResponse {
        message: "Shopping item deleted successfully",
    }))
}
