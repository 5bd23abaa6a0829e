//! Session Routes - short-term memory, chat turns and turn context
//!
//! Every handler builds a `SessionContext` from the path and the configured
//! memory toggle; memory disabled yields empty reads and no captures.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::application::Capture;
use crate::models::{
    parse_priority, promotion_label, CaptureMemoryRequest, CaptureResponse, ContextQuery,
    ContextResponse, EpisodeResponse, LimitQuery, MemoryResponse, RecallResponse,
    RecordMessageRequest, RecordMessageResponse, SessionSearchQuery,
};
use crate::AppState;

use super::{api_error, bad_request, ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/sessions/:session_id/memories",
            post(capture_memory).get(recent_memories).delete(clear_session),
        )
        .route("/sessions/:session_id/memories/search", get(search_session))
        .route(
            "/sessions/:session_id/memories/:id/recall",
            post(recall_session_memory),
        )
        .route("/sessions/:session_id/context", get(turn_context))
        .route("/sessions/:session_id/messages", post(record_message))
        .route("/sessions/:session_id/episodes", get(session_episodes))
}

/// Capture a memory into the session's short-term buffer
#[utoipa::path(
    post,
    path = "/sessions/{session_id}/memories",
    params(("session_id" = String, Path, description = "Session ID")),
    request_body = CaptureMemoryRequest,
    responses(
        (status = 200, description = "Captured, or skipped when memory is disabled", body = CaptureResponse),
        (status = 422, description = "Invalid input")
    ),
    tag = "Session"
)]
pub async fn capture_memory(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<CaptureMemoryRequest>,
) -> Result<Json<CaptureResponse>, ApiError> {
    let ctx = state.session(session_id);
    let priority = parse_priority(payload.priority.as_deref())
        .map_err(bad_request)?
        .unwrap_or_default();
    let captured = state
        .sessions
        .capture(
            &ctx,
            Capture {
                content: payload.content,
                tags: payload.tags,
                emotion_tag: payload.emotion_tag,
                priority,
            },
        )
        .await
        .map_err(api_error)?;

    Ok(Json(CaptureResponse {
        memory_enabled: ctx.memory_enabled,
        memory: captured.map(Into::into),
    }))
}

/// Most recent short-term memories, newest first
#[utoipa::path(
    get,
    path = "/sessions/{session_id}/memories",
    params(("session_id" = String, Path, description = "Session ID"), LimitQuery),
    responses((status = 200, description = "Recent memories", body = Vec<MemoryResponse>)),
    tag = "Session"
)]
pub async fn recent_memories(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<MemoryResponse>> {
    let ctx = state.session(session_id);
    let limit = query.or(state.config.context.short_term_items);
    let items = state.sessions.recent(&ctx, limit).await;
    Json(items.into_iter().map(Into::into).collect())
}

/// Search the session's buffer; each hit counts as a retrieval
#[utoipa::path(
    get,
    path = "/sessions/{session_id}/memories/search",
    params(("session_id" = String, Path, description = "Session ID"), SessionSearchQuery),
    responses((status = 200, description = "Matching memories", body = Vec<MemoryResponse>)),
    tag = "Session"
)]
pub async fn search_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<SessionSearchQuery>,
) -> Result<Json<Vec<MemoryResponse>>, ApiError> {
    let ctx = state.session(session_id);
    let items = state
        .sessions
        .search(&ctx, &query.query, query.limit.unwrap_or(10))
        .await
        .map_err(api_error)?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// Retrieve a short-term memory; reaching the threshold promotes it
#[utoipa::path(
    post,
    path = "/sessions/{session_id}/memories/{id}/recall",
    params(
        ("session_id" = String, Path, description = "Session ID"),
        ("id" = String, Path, description = "Memory ID")
    ),
    responses(
        (status = 200, description = "Memory recalled", body = RecallResponse),
        (status = 404, description = "Memory not in the session buffer")
    ),
    tag = "Session"
)]
pub async fn recall_session_memory(
    State(state): State<AppState>,
    Path((session_id, id)): Path<(String, String)>,
) -> Result<Json<RecallResponse>, ApiError> {
    let ctx = state.session(session_id);
    let recall = state.sessions.recall(&ctx, &id).await.map_err(api_error)?;
    Ok(Json(RecallResponse {
        memory: recall.item.into(),
        promotion: promotion_label(recall.promotion),
    }))
}

/// Drop the session's short-term buffer
#[utoipa::path(
    delete,
    path = "/sessions/{session_id}/memories",
    params(("session_id" = String, Path, description = "Session ID")),
    responses((status = 204, description = "Buffer cleared")),
    tag = "Session"
)]
pub async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> StatusCode {
    let ctx = state.session(session_id);
    let cleared = state.sessions.clear(&ctx).await;
    tracing::info!(session_id = %ctx.session_id, cleared, "Session buffer cleared");
    StatusCode::NO_CONTENT
}

/// Assemble the memory context for one turn
#[utoipa::path(
    get,
    path = "/sessions/{session_id}/context",
    params(("session_id" = String, Path, description = "Session ID"), ContextQuery),
    responses((status = 200, description = "Turn context", body = ContextResponse)),
    tag = "Session"
)]
pub async fn turn_context(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<ContextQuery>,
) -> Json<ContextResponse> {
    let ctx = state.session(session_id);
    let turn = state
        .context
        .build(&ctx, query.query.as_deref().unwrap_or_default())
        .await;
    Json(turn.into())
}

/// Record a chat message in the session's active episode
#[utoipa::path(
    post,
    path = "/sessions/{session_id}/messages",
    params(("session_id" = String, Path, description = "Session ID")),
    request_body = RecordMessageRequest,
    responses(
        (status = 200, description = "Message recorded", body = RecordMessageResponse),
        (status = 422, description = "Unknown role")
    ),
    tag = "Session"
)]
pub async fn record_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<RecordMessageRequest>,
) -> Result<Json<RecordMessageResponse>, ApiError> {
    let (episode_id, event) = state
        .episodes
        .record_message(&session_id, &payload.role, &payload.content)
        .await
        .map_err(api_error)?;
    Ok(Json(RecordMessageResponse {
        episode_id,
        event: event.into(),
    }))
}

/// Every episode recorded for the session
#[utoipa::path(
    get,
    path = "/sessions/{session_id}/episodes",
    params(("session_id" = String, Path, description = "Session ID")),
    responses((status = 200, description = "Episodes of the session", body = Vec<EpisodeResponse>)),
    tag = "Session"
)]
pub async fn session_episodes(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<EpisodeResponse>>, ApiError> {
    let episodes = state
        .episodes
        .session_episodes(&session_id)
        .await
        .map_err(api_error)?;
    Ok(Json(episodes.into_iter().map(Into::into).collect()))
}
