//! Transcript DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use telly::TranscriptRecord;

use crate::application::{SaveTranscript, TranscriptHit, TranscriptSearch, TranscriptStats};

fn default_limit() -> usize {
    5
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveTranscriptRequest {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub transcript: String,
    #[serde(default)]
    pub action_plan: String,
    pub summary: Option<String>,
}

impl From<SaveTranscriptRequest> for SaveTranscript {
    fn from(req: SaveTranscriptRequest) -> Self {
        Self {
            url: req.url,
            title: req.title,
            transcript: req.transcript,
            action_plan: req.action_plan,
            summary: req.summary,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaveTranscriptResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TranscriptResponse {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub transcript_text: String,
    pub action_plan: String,
    pub summary: String,
    pub embedded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TranscriptRecord> for TranscriptResponse {
    fn from(r: TranscriptRecord) -> Self {
        Self {
            embedded: !r.embedding.is_empty(),
            id: r.id,
            url: r.url,
            title: r.title,
            transcript_text: r.transcript_text,
            action_plan: r.action_plan,
            summary: r.summary,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TranscriptSearchRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TranscriptHitResponse {
    pub transcript: TranscriptResponse,
    pub score: f32,
}

impl From<TranscriptHit> for TranscriptHitResponse {
    fn from(hit: TranscriptHit) -> Self {
        Self {
            transcript: hit.record.into(),
            score: hit.score,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TranscriptSearchResponse {
    /// semantic | keyword
    pub mode: String,
    pub degraded_reason: Option<String>,
    pub hits: Vec<TranscriptHitResponse>,
}

impl From<TranscriptSearch> for TranscriptSearchResponse {
    fn from(search: TranscriptSearch) -> Self {
        Self {
            mode: search.mode.to_string(),
            degraded_reason: search.degraded_reason,
            hits: search.hits.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TranscriptStatsResponse {
    pub total: usize,
    pub embedded: usize,
    pub vectors: usize,
    pub latest_update: Option<DateTime<Utc>>,
}

impl From<TranscriptStats> for TranscriptStatsResponse {
    fn from(s: TranscriptStats) -> Self {
        Self {
            total: s.total,
            embedded: s.embedded,
            vectors: s.vectors,
            latest_update: s.latest_update,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UrlQuery {
    pub url: String,
}
