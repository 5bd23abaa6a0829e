//! Episode Routes - Episodic recorder
//!
//! HTTP handlers that delegate to EpisodeService.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use telly::{EpisodeType, EventType, NewEvent};

use crate::application::StartEpisode;
use crate::models::{
    AppendEventRequest, BackfillRequest, CloseEpisodeRequest, ConversationTurnResponse,
    EpisodeResponse, EpisodeSearchRequest, EpisodeSearchResponse, EventResponse,
    LinkMemoryRequest, MetricsResponse, StartEpisodeRequest, SweepResponse,
};
use crate::AppState;

use super::{api_error, bad_request, ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/episodes", post(start_episode))
        .route("/episodes/active", get(list_active))
        .route("/episodes/search", post(search_episodes))
        .route("/episodes/sweep", post(sweep_idle))
        .route("/episodes/:id", get(get_episode))
        .route("/episodes/:id/events", post(append_event))
        .route("/episodes/:id/close", post(close_episode))
        .route("/episodes/:id/backfill", post(backfill_episode))
        .route("/episodes/:id/memories", post(link_memory))
        .route("/episodes/:id/history", get(conversation_history))
}

/// Start an episode, or return the session's active one
#[utoipa::path(
    post,
    path = "/episodes",
    request_body = StartEpisodeRequest,
    responses(
        (status = 200, description = "Active episode", body = EpisodeResponse),
        (status = 422, description = "Invalid input")
    ),
    tag = "Episode"
)]
pub async fn start_episode(
    State(state): State<AppState>,
    Json(payload): Json<StartEpisodeRequest>,
) -> Result<Json<EpisodeResponse>, ApiError> {
    let episode_type = payload
        .episode_type
        .as_deref()
        .map(str::parse::<EpisodeType>)
        .transpose()
        .map_err(bad_request)?
        .unwrap_or_default();

    let mut params = StartEpisode::conversation(payload.session_id);
    params.episode_type = episode_type;
    if let Some(title) = payload.title {
        params.title = title;
    }
    if !payload.participants.is_empty() {
        params.participants = payload.participants;
    }
    params.context = payload.context.unwrap_or_default();

    let episode = state
        .episodes
        .start_episode(params)
        .await
        .map_err(api_error)?;
    Ok(Json(episode.into()))
}

/// Append an event to an active episode
#[utoipa::path(
    post,
    path = "/episodes/{id}/events",
    params(("id" = Uuid, Path, description = "Episode ID")),
    request_body = AppendEventRequest,
    responses(
        (status = 200, description = "Event appended", body = EventResponse),
        (status = 404, description = "Episode missing or closed"),
        (status = 422, description = "Invalid event")
    ),
    tag = "Episode"
)]
pub async fn append_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AppendEventRequest>,
) -> Result<Json<EventResponse>, ApiError> {
    let event_type: EventType = payload.event_type.parse().map_err(bad_request)?;
    let mut event = NewEvent::new(event_type, payload.actor, payload.action)
        .with_data(payload.data.unwrap_or_default());
    if let Some(impact) = payload.impact_score {
        event = event.with_impact(impact);
    }

    let appended = state
        .episodes
        .append_event(id, event)
        .await
        .map_err(api_error)?;
    Ok(Json(appended.into()))
}

/// Close an episode; closing again returns the stored metrics
#[utoipa::path(
    post,
    path = "/episodes/{id}/close",
    params(("id" = Uuid, Path, description = "Episode ID")),
    request_body = CloseEpisodeRequest,
    responses(
        (status = 200, description = "Episode metrics", body = MetricsResponse),
        (status = 404, description = "Episode not found")
    ),
    tag = "Episode"
)]
pub async fn close_episode(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CloseEpisodeRequest>,
) -> Result<Json<MetricsResponse>, ApiError> {
    let metrics = state
        .episodes
        .close_episode(id, &payload.outcome)
        .await
        .map_err(api_error)?;
    Ok(Json(metrics.into()))
}

/// Record an outcome or success metrics after the fact
#[utoipa::path(
    post,
    path = "/episodes/{id}/backfill",
    params(("id" = Uuid, Path, description = "Episode ID")),
    request_body = BackfillRequest,
    responses(
        (status = 200, description = "Updated episode", body = EpisodeResponse),
        (status = 404, description = "Episode not found")
    ),
    tag = "Episode"
)]
pub async fn backfill_episode(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BackfillRequest>,
) -> Result<Json<EpisodeResponse>, ApiError> {
    let episode = state
        .episodes
        .backfill(id, payload.outcome, payload.success_metrics)
        .await
        .map_err(api_error)?;
    Ok(Json(episode.into()))
}

/// Register a memory created during the episode
#[utoipa::path(
    post,
    path = "/episodes/{id}/memories",
    params(("id" = Uuid, Path, description = "Episode ID")),
    request_body = LinkMemoryRequest,
    responses(
        (status = 200, description = "Updated episode", body = EpisodeResponse),
        (status = 404, description = "Episode missing or closed")
    ),
    tag = "Episode"
)]
pub async fn link_memory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LinkMemoryRequest>,
) -> Result<Json<EpisodeResponse>, ApiError> {
    let episode = state
        .episodes
        .link_memory(id, &payload.memory_id)
        .await
        .map_err(api_error)?;
    Ok(Json(episode.into()))
}

/// Get an episode by ID
#[utoipa::path(
    get,
    path = "/episodes/{id}",
    params(("id" = Uuid, Path, description = "Episode ID")),
    responses(
        (status = 200, description = "Episode found", body = EpisodeResponse),
        (status = 404, description = "Episode not found")
    ),
    tag = "Episode"
)]
pub async fn get_episode(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EpisodeResponse>, ApiError> {
    let episode = state
        .episodes
        .get(id)
        .await
        .map_err(api_error)?
        .ok_or_else(|| api_error(telly::DomainError::not_found("Episode", id)))?;
    Ok(Json(episode.into()))
}

/// Chat messages of an episode in order
#[utoipa::path(
    get,
    path = "/episodes/{id}/history",
    params(("id" = Uuid, Path, description = "Episode ID")),
    responses(
        (status = 200, description = "Conversation turns", body = Vec<ConversationTurnResponse>),
        (status = 404, description = "Episode not found")
    ),
    tag = "Episode"
)]
pub async fn conversation_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ConversationTurnResponse>>, ApiError> {
    let turns = state
        .episodes
        .conversation_history(id)
        .await
        .map_err(api_error)?;
    Ok(Json(turns.into_iter().map(Into::into).collect()))
}

/// Every ACTIVE episode, most recently active first
#[utoipa::path(
    get,
    path = "/episodes/active",
    responses((status = 200, description = "Active episodes", body = Vec<EpisodeResponse>)),
    tag = "Episode"
)]
pub async fn list_active(
    State(state): State<AppState>,
) -> Result<Json<Vec<EpisodeResponse>>, ApiError> {
    let episodes = state.episodes.list_active().await.map_err(api_error)?;
    Ok(Json(episodes.into_iter().map(Into::into).collect()))
}

/// Keyword plus semantic search over episodes
#[utoipa::path(
    post,
    path = "/episodes/search",
    request_body = EpisodeSearchRequest,
    responses((status = 200, description = "Ranked episodes", body = EpisodeSearchResponse)),
    tag = "Episode"
)]
pub async fn search_episodes(
    State(state): State<AppState>,
    Json(payload): Json<EpisodeSearchRequest>,
) -> Result<Json<EpisodeSearchResponse>, ApiError> {
    let results = state
        .episodes
        .search(&payload.query, payload.limit)
        .await
        .map_err(api_error)?;
    Ok(Json(results.into()))
}

/// Close every episode idle at the current time
#[utoipa::path(
    post,
    path = "/episodes/sweep",
    responses((status = 200, description = "Episodes closed by the sweep", body = SweepResponse)),
    tag = "Episode"
)]
pub async fn sweep_idle(State(state): State<AppState>) -> Json<SweepResponse> {
    let closed = state.episodes.sweep_idle().await;
    Json(SweepResponse {
        closed: closed.into_iter().map(Into::into).collect(),
    })
}
