//! Memory DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use telly::{MemoryItem, MemoryPriority, MemorySearchFilter, TagMatchMode};

use crate::application::{ContextEntry, ContextTier, Consolidation, ScoredMemory, TurnContext};

fn default_top_k() -> usize {
    5
}

/// Store a memory directly in the long-term store
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMemoryRequest {
    pub content: String,
    pub session_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// low | medium | high | critical
    pub priority: Option<String>,
}

/// Semantic search over the long-term store
#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchMemoriesRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub tags: Vec<String>,
    /// any | all (default any)
    pub tags_match_mode: Option<String>,
    pub min_priority: Option<String>,
    pub session_id: Option<String>,
}

impl SearchMemoriesRequest {
    pub fn filter(&self) -> Result<MemorySearchFilter, String> {
        let tags_match_mode = match self.tags_match_mode.as_deref() {
            None | Some("any") => TagMatchMode::Any,
            Some("all") => TagMatchMode::All,
            Some(other) => return Err(format!("Unknown tags_match_mode: {}", other)),
        };
        Ok(MemorySearchFilter {
            tags: self.tags.clone(),
            tags_match_mode,
            min_priority: parse_priority(self.min_priority.as_deref())?,
            session_id: self.session_id.clone(),
        })
    }
}

pub fn parse_priority(value: Option<&str>) -> Result<Option<MemoryPriority>, String> {
    value.map(str::parse::<MemoryPriority>).transpose()
}

/// Capture a memory into a session's short-term buffer
#[derive(Debug, Deserialize, ToSchema)]
pub struct CaptureMemoryRequest {
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub emotion_tag: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MemoryResponse {
    pub id: String,
    pub session_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u32,
    pub tags: Vec<String>,
    pub emotion_tag: Option<String>,
    pub priority: String,
    pub source: String,
    pub embedded: bool,
}

impl From<MemoryItem> for MemoryResponse {
    fn from(item: MemoryItem) -> Self {
        Self {
            embedded: !item.embedding.is_empty(),
            id: item.id,
            session_id: item.session_id,
            content: item.content,
            created_at: item.created_at,
            last_accessed_at: item.last_accessed_at,
            access_count: item.access_count,
            tags: item.tags,
            emotion_tag: item.emotion_tag,
            priority: item.priority.to_string(),
            source: item.source.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScoredMemoryResponse {
    pub memory: MemoryResponse,
    pub score: f32,
}

impl From<ScoredMemory> for ScoredMemoryResponse {
    fn from(scored: ScoredMemory) -> Self {
        Self {
            memory: scored.item.into(),
            score: scored.score,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CaptureResponse {
    pub memory_enabled: bool,
    pub memory: Option<MemoryResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecallResponse {
    pub memory: MemoryResponse,
    /// inserted | refreshed when the access reached the consolidation threshold
    pub promotion: Option<String>,
}

pub fn promotion_label(promotion: Option<Consolidation>) -> Option<String> {
    promotion.map(|p| match p {
        Consolidation::Inserted => "inserted".to_string(),
        Consolidation::Refreshed => "refreshed".to_string(),
    })
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ContextQuery {
    /// Text of the current turn, used for long-term retrieval
    pub query: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SessionSearchQuery {
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContextEntryResponse {
    /// "short_term" or "long_term"
    pub tier: String,
    pub memory: MemoryResponse,
    pub score: Option<f32>,
}

impl From<ContextEntry> for ContextEntryResponse {
    fn from(entry: ContextEntry) -> Self {
        let tier = match entry.tier {
            ContextTier::ShortTerm => "short_term",
            ContextTier::LongTerm => "long_term",
        };
        Self {
            tier: tier.to_string(),
            memory: entry.item.into(),
            score: entry.score,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContextResponse {
    /// Short-term then long-term memories in prompt order
    pub entries: Vec<ContextEntryResponse>,
    pub short_term: Vec<MemoryResponse>,
    pub long_term: Vec<ScoredMemoryResponse>,
    pub episode_excerpt: Option<String>,
    pub degraded: Option<String>,
    pub total_chars: usize,
    pub rendered: String,
}

impl From<TurnContext> for ContextResponse {
    fn from(turn: TurnContext) -> Self {
        let rendered = turn.render();
        let entries = turn.entries().into_iter().map(Into::into).collect();
        Self {
            entries,
            short_term: turn.short_term.into_iter().map(Into::into).collect(),
            long_term: turn
                .long_term
                .into_iter()
                .map(|(item, score)| ScoredMemoryResponse {
                    memory: item.into(),
                    score,
                })
                .collect(),
            episode_excerpt: turn.episode_excerpt,
            degraded: turn.degraded,
            total_chars: turn.total_chars,
            rendered,
        }
    }
}
