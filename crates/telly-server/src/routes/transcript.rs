//! Transcript Routes
//!
//! HTTP handlers that delegate to TranscriptService.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::models::{
    LimitQuery, SaveTranscriptRequest, SaveTranscriptResponse, TranscriptHitResponse,
    TranscriptResponse, TranscriptSearchRequest, TranscriptSearchResponse,
    TranscriptStatsResponse, UrlQuery,
};
use crate::AppState;

use super::{api_error, ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transcripts", post(save_transcript).get(recent_transcripts))
        .route("/transcripts/stats", get(transcript_stats))
        .route("/transcripts/by-url", get(get_by_url))
        .route("/transcripts/search", post(search_transcripts))
        .route("/transcripts/:id", get(get_transcript))
        .route("/transcripts/:id/related", get(related_transcripts))
}

fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, "Transcript not found".to_string())
}

/// Save a transcript; re-saving a URL overwrites it in place
#[utoipa::path(
    post,
    path = "/transcripts",
    request_body = SaveTranscriptRequest,
    responses(
        (status = 200, description = "Transcript saved", body = SaveTranscriptResponse),
        (status = 422, description = "Invalid input")
    ),
    tag = "Transcript"
)]
pub async fn save_transcript(
    State(state): State<AppState>,
    Json(payload): Json<SaveTranscriptRequest>,
) -> Result<Json<SaveTranscriptResponse>, ApiError> {
    let id = state
        .transcripts
        .save(payload.into())
        .await
        .map_err(api_error)?;
    Ok(Json(SaveTranscriptResponse { id }))
}

/// Most recently updated transcripts
#[utoipa::path(
    get,
    path = "/transcripts",
    params(LimitQuery),
    responses((status = 200, description = "Recent transcripts", body = Vec<TranscriptResponse>)),
    tag = "Transcript"
)]
pub async fn recent_transcripts(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<TranscriptResponse>>, ApiError> {
    let records = state
        .transcripts
        .recent(query.or(20))
        .await
        .map_err(api_error)?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Store statistics
#[utoipa::path(
    get,
    path = "/transcripts/stats",
    responses((status = 200, description = "Transcript statistics", body = TranscriptStatsResponse)),
    tag = "Transcript"
)]
pub async fn transcript_stats(
    State(state): State<AppState>,
) -> Result<Json<TranscriptStatsResponse>, ApiError> {
    let stats = state.transcripts.stats().await.map_err(api_error)?;
    Ok(Json(stats.into()))
}

/// Look a transcript up by its source URL
#[utoipa::path(
    get,
    path = "/transcripts/by-url",
    params(UrlQuery),
    responses(
        (status = 200, description = "Transcript found", body = TranscriptResponse),
        (status = 404, description = "Transcript not found")
    ),
    tag = "Transcript"
)]
pub async fn get_by_url(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let record = state
        .transcripts
        .get_by_url(query.url.trim())
        .await
        .map_err(api_error)?
        .ok_or_else(not_found)?;
    Ok(Json(record.into()))
}

/// Semantic search with keyword fallback
#[utoipa::path(
    post,
    path = "/transcripts/search",
    request_body = TranscriptSearchRequest,
    responses((status = 200, description = "Ranked transcripts", body = TranscriptSearchResponse)),
    tag = "Transcript"
)]
pub async fn search_transcripts(
    State(state): State<AppState>,
    Json(payload): Json<TranscriptSearchRequest>,
) -> Result<Json<TranscriptSearchResponse>, ApiError> {
    let results = state
        .transcripts
        .search(&payload.query, payload.limit)
        .await
        .map_err(api_error)?;
    Ok(Json(results.into()))
}

/// Get a transcript by ID
#[utoipa::path(
    get,
    path = "/transcripts/{id}",
    params(("id" = Uuid, Path, description = "Transcript ID")),
    responses(
        (status = 200, description = "Transcript found", body = TranscriptResponse),
        (status = 404, description = "Transcript not found")
    ),
    tag = "Transcript"
)]
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let record = state
        .transcripts
        .get(id)
        .await
        .map_err(api_error)?
        .ok_or_else(not_found)?;
    Ok(Json(record.into()))
}

/// Nearest transcripts, excluding the transcript itself
#[utoipa::path(
    get,
    path = "/transcripts/{id}/related",
    params(("id" = Uuid, Path, description = "Transcript ID"), LimitQuery),
    responses(
        (status = 200, description = "Related transcripts", body = Vec<TranscriptHitResponse>),
        (status = 404, description = "Transcript not found"),
        (status = 503, description = "Transcript has no embedding")
    ),
    tag = "Transcript"
)]
pub async fn related_transcripts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<TranscriptHitResponse>>, ApiError> {
    let hits = state
        .transcripts
        .related(id, query.or(5))
        .await
        .map_err(api_error)?;
    Ok(Json(hits.into_iter().map(Into::into).collect()))
}
