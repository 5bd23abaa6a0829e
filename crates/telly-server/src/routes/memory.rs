//! Long-Term Memory Routes
//!
//! HTTP handlers that delegate to LongTermService.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::models::{
    parse_priority, CreateMemoryRequest, MemoryResponse, ScoredMemoryResponse,
    SearchMemoriesRequest,
};
use crate::AppState;

use super::{api_error, bad_request, ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/memories", post(add_memory))
        .route("/memories/search", post(search_memories))
        .route("/memories/:id", get(get_memory).delete(delete_memory))
        .route("/memories/:id/recall", post(recall_memory))
}

/// Store a memory directly in the long-term store
#[utoipa::path(
    post,
    path = "/memories",
    request_body = CreateMemoryRequest,
    responses(
        (status = 200, description = "Memory stored", body = MemoryResponse),
        (status = 422, description = "Invalid input"),
        (status = 503, description = "Embedding backend unavailable"),
        (status = 504, description = "Backend timed out")
    ),
    tag = "Memory"
)]
pub async fn add_memory(
    State(state): State<AppState>,
    Json(payload): Json<CreateMemoryRequest>,
) -> Result<Json<MemoryResponse>, ApiError> {
    if payload.content.trim().is_empty() {
        return Err(bad_request("content is required".to_string()));
    }
    let priority = parse_priority(payload.priority.as_deref())
        .map_err(bad_request)?
        .unwrap_or_default();

    let item = state
        .long_term
        .remember(payload.content, payload.session_id, payload.tags, priority)
        .await
        .map_err(api_error)?;

    Ok(Json(item.into()))
}

/// Semantic search over long-term memories
#[utoipa::path(
    post,
    path = "/memories/search",
    request_body = SearchMemoriesRequest,
    responses(
        (status = 200, description = "Matches by descending similarity", body = Vec<ScoredMemoryResponse>),
        (status = 503, description = "Semantic search unavailable")
    ),
    tag = "Memory"
)]
pub async fn search_memories(
    State(state): State<AppState>,
    Json(payload): Json<SearchMemoriesRequest>,
) -> Result<Json<Vec<ScoredMemoryResponse>>, ApiError> {
    let filter = payload.filter().map_err(bad_request)?;
    let results = state
        .long_term
        .search_text(&payload.query, payload.top_k, &filter)
        .await
        .map_err(api_error)?;

    Ok(Json(results.into_iter().map(Into::into).collect()))
}

/// Get a memory without counting it as a retrieval
#[utoipa::path(
    get,
    path = "/memories/{id}",
    params(("id" = String, Path, description = "Memory ID")),
    responses(
        (status = 200, description = "Memory found", body = MemoryResponse),
        (status = 404, description = "Memory not found")
    ),
    tag = "Memory"
)]
pub async fn get_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MemoryResponse>, ApiError> {
    let item = state
        .long_term
        .get(&id)
        .await
        .map_err(api_error)?
        .ok_or((StatusCode::NOT_FOUND, "Memory not found".to_string()))?;

    Ok(Json(item.into()))
}

/// Retrieve a memory, counting the access
#[utoipa::path(
    post,
    path = "/memories/{id}/recall",
    params(("id" = String, Path, description = "Memory ID")),
    responses(
        (status = 200, description = "Memory recalled", body = MemoryResponse),
        (status = 404, description = "Memory not found")
    ),
    tag = "Memory"
)]
pub async fn recall_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MemoryResponse>, ApiError> {
    let item = state.long_term.recall(&id).await.map_err(api_error)?;
    Ok(Json(item.into()))
}

/// Forget a memory
#[utoipa::path(
    delete,
    path = "/memories/{id}",
    params(("id" = String, Path, description = "Memory ID")),
    responses(
        (status = 204, description = "Memory deleted"),
        (status = 404, description = "Memory not found")
    ),
    tag = "Memory"
)]
pub async fn delete_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.long_term.remove(&id).await.map_err(api_error)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Memory not found".to_string()))
    }
}
