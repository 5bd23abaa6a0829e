//! Episode DTOs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use telly::{ConversationTurn, Episode, EpisodeMetrics, Event};

use crate::application::{EpisodeHit, EpisodeSearch};

fn default_limit() -> usize {
    10
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartEpisodeRequest {
    pub session_id: String,
    /// conversation | task_completion | learning | problem_solving | creative
    pub episode_type: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub participants: Vec<String>,
    #[schema(value_type = Object)]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AppendEventRequest {
    /// user_message | assistant_response | tool_call | note
    pub event_type: String,
    pub actor: String,
    pub action: String,
    #[schema(value_type = Object)]
    pub data: Option<serde_json::Value>,
    pub impact_score: Option<f32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordMessageRequest {
    /// user | assistant
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecordMessageResponse {
    pub episode_id: Uuid,
    pub event: EventResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CloseEpisodeRequest {
    pub outcome: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BackfillRequest {
    pub outcome: Option<String>,
    #[serde(default)]
    pub success_metrics: HashMap<String, f32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LinkMemoryRequest {
    pub memory_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EpisodeSearchRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventResponse {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub actor: String,
    pub action: String,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    pub impact_score: f32,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            timestamp: event.timestamp,
            event_type: event.event_type.to_string(),
            actor: event.actor,
            action: event.action,
            data: event.data,
            impact_score: event.impact_score,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MetricsResponse {
    pub episode_id: Uuid,
    pub outcome: String,
    pub closed_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub event_count: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub mean_impact: f32,
    pub memories_created: Vec<String>,
}

impl From<EpisodeMetrics> for MetricsResponse {
    fn from(m: EpisodeMetrics) -> Self {
        Self {
            episode_id: m.episode_id,
            outcome: m.outcome,
            closed_at: m.closed_at,
            duration_secs: m.duration_secs,
            event_count: m.event_count,
            user_messages: m.user_messages,
            assistant_messages: m.assistant_messages,
            mean_impact: m.mean_impact,
            memories_created: m.memories_created,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EpisodeResponse {
    pub id: Uuid,
    pub session_id: String,
    pub episode_type: String,
    pub title: String,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub last_event_at: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub participants: Vec<String>,
    #[schema(value_type = Object)]
    pub context: serde_json::Value,
    pub events: Vec<EventResponse>,
    pub outcome: Option<String>,
    pub summary: Option<String>,
    pub metrics: Option<MetricsResponse>,
    pub success_metrics: HashMap<String, f32>,
    pub memories_created: Vec<String>,
}

impl From<Episode> for EpisodeResponse {
    fn from(e: Episode) -> Self {
        Self {
            id: e.id,
            session_id: e.session_id,
            episode_type: e.episode_type.to_string(),
            title: e.title,
            status: e.status.to_string(),
            start_time: e.start_time,
            last_event_at: e.last_event_at,
            end_time: e.end_time,
            participants: e.participants.into_iter().collect(),
            context: e.context,
            events: e.events.into_iter().map(Into::into).collect(),
            outcome: e.outcome,
            summary: e.summary,
            metrics: e.metrics.map(Into::into),
            success_metrics: e.success_metrics,
            memories_created: e.memories_created,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EpisodeHitResponse {
    pub episode: EpisodeResponse,
    pub score: f32,
    pub keyword_score: f32,
    pub semantic_score: Option<f32>,
}

impl From<EpisodeHit> for EpisodeHitResponse {
    fn from(hit: EpisodeHit) -> Self {
        Self {
            episode: hit.episode.into(),
            score: hit.score,
            keyword_score: hit.keyword_score,
            semantic_score: hit.semantic_score,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EpisodeSearchResponse {
    /// semantic | keyword | hybrid
    pub mode: String,
    pub degraded_reason: Option<String>,
    pub hits: Vec<EpisodeHitResponse>,
}

impl From<EpisodeSearch> for EpisodeSearchResponse {
    fn from(search: EpisodeSearch) -> Self {
        Self {
            mode: search.mode.to_string(),
            degraded_reason: search.degraded_reason,
            hits: search.hits.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationTurnResponse {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ConversationTurn> for ConversationTurnResponse {
    fn from(turn: ConversationTurn) -> Self {
        Self {
            role: turn.role,
            content: turn.content,
            timestamp: turn.timestamp,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SweepResponse {
    pub closed: Vec<MetricsResponse>,
}
