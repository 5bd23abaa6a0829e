//! Episode - A recorded, bounded conversation session
//!
//! Pure domain entity without infrastructure dependencies. The recorder in
//! the application layer owns the state transitions; the entity only keeps
//! its own invariants (ordered events, end after start, closed is final).

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::value_objects::{EpisodeStatus, EpisodeType, EventType};

/// Outcome recorded when the idle timer closes an episode
pub const AUTO_CLOSED_OUTCOME: &str = "auto_closed";

/// Single entry of an episode's event log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub actor: String,
    pub action: String,
    #[serde(default)]
    pub data: serde_json::Value,
    /// Impact score (0.0 - 1.0)
    pub impact_score: f32,
}

/// Event as submitted by a caller; the recorder assigns the timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub event_type: EventType,
    pub actor: String,
    pub action: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default = "default_impact")]
    pub impact_score: f32,
}

fn default_impact() -> f32 {
    0.5
}

impl NewEvent {
    pub fn new(event_type: EventType, actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            event_type,
            actor: actor.into(),
            action: action.into(),
            data: serde_json::Value::Null,
            impact_score: default_impact(),
        }
    }

    pub fn user_message(content: impl Into<String>) -> Self {
        Self::new(EventType::UserMessage, "user", "sent_message")
            .with_data(serde_json::json!({ "content": content.into() }))
    }

    pub fn assistant_response(content: impl Into<String>) -> Self {
        Self::new(EventType::AssistantResponse, "assistant", "responded")
            .with_data(serde_json::json!({ "content": content.into() }))
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_impact(mut self, impact_score: f32) -> Self {
        self.impact_score = impact_score;
        self
    }

    /// Reject malformed input at the call boundary
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(0.0..=1.0).contains(&self.impact_score) || self.impact_score.is_nan() {
            return Err(DomainError::Validation(format!(
                "impact_score must be within [0, 1], got {}",
                self.impact_score
            )));
        }
        if self.actor.trim().is_empty() {
            return Err(DomainError::Validation("event actor is required".into()));
        }
        if self.event_type.is_lifecycle() {
            return Err(DomainError::Validation(format!(
                "{} events are emitted by the recorder",
                self.event_type
            )));
        }
        Ok(())
    }
}

/// Result of closing an episode. Stored on the episode so a repeated close
/// returns exactly the same value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeMetrics {
    pub episode_id: Uuid,
    pub outcome: String,
    pub closed_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub event_count: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    /// Mean impact over non-lifecycle events, 0.0 when there are none
    pub mean_impact: f32,
    pub memories_created: Vec<String>,
}

/// Episode - ordered event log of one conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    pub id: Uuid,
    pub session_id: String,
    pub episode_type: EpisodeType,
    pub title: String,
    pub status: EpisodeStatus,
    pub start_time: DateTime<Utc>,
    /// Timestamp of the newest event; drives the idle timer
    pub last_event_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub participants: BTreeSet<String>,
    #[serde(default)]
    pub context: serde_json::Value,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<EpisodeMetrics>,
    #[serde(default)]
    pub success_metrics: HashMap<String, f32>,
    #[serde(default)]
    pub memories_created: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Episode {
    /// Create a new active episode with its `episode_start` event
    pub fn start(
        session_id: impl Into<String>,
        episode_type: EpisodeType,
        title: impl Into<String>,
        participants: impl IntoIterator<Item = String>,
        context: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        let title = title.into();
        let mut episode = Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            episode_type,
            title: title.clone(),
            status: EpisodeStatus::Active,
            start_time: now,
            last_event_at: now,
            end_time: None,
            participants: participants.into_iter().collect(),
            context,
            events: Vec::new(),
            outcome: None,
            summary: None,
            metrics: None,
            success_metrics: HashMap::new(),
            memories_created: Vec::new(),
            metadata: serde_json::Value::Null,
        };
        episode.events.push(Event {
            timestamp: now,
            event_type: EventType::EpisodeStart,
            actor: "system".to_string(),
            action: "started_episode".to_string(),
            data: serde_json::json!({ "title": title, "type": episode_type }),
            impact_score: 0.5,
        });
        episode
    }

    pub fn is_active(&self) -> bool {
        self.status == EpisodeStatus::Active
    }

    /// Append an event. Timestamps never move backwards: an event stamped
    /// before the newest one is recorded at the newest timestamp.
    pub fn push_event(&mut self, event: NewEvent, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_active() {
            return Err(DomainError::not_found("Episode", self.id));
        }
        let timestamp = now.max(self.last_event_at);
        if event.actor != "system" {
            self.participants.insert(event.actor.clone());
        }
        self.events.push(Event {
            timestamp,
            event_type: event.event_type,
            actor: event.actor,
            action: event.action,
            data: event.data,
            impact_score: event.impact_score,
        });
        self.last_event_at = timestamp;
        Ok(())
    }

    /// Whether the idle timeout has elapsed at `now`
    pub fn is_idle(&self, now: DateTime<Utc>, idle_timeout: chrono::Duration) -> bool {
        self.is_active() && now - self.last_event_at >= idle_timeout
    }

    /// Instant at which the idle timer fires
    pub fn idle_deadline(&self, idle_timeout: chrono::Duration) -> DateTime<Utc> {
        self.last_event_at + idle_timeout
    }

    pub fn link_memory(&mut self, memory_id: impl Into<String>) {
        let memory_id = memory_id.into();
        if !self.memories_created.contains(&memory_id) {
            self.memories_created.push(memory_id);
        }
    }

    /// Close the episode and compute its metrics. Returns the stored metrics
    /// unchanged when the episode is already closed.
    pub fn close(&mut self, outcome: impl Into<String>, now: DateTime<Utc>) -> EpisodeMetrics {
        if let Some(metrics) = &self.metrics {
            return metrics.clone();
        }

        let outcome = outcome.into();
        let closed_at = now.max(self.last_event_at).max(self.start_time);
        let duration_secs = (closed_at - self.start_time).num_seconds();

        self.events.push(Event {
            timestamp: closed_at,
            event_type: EventType::EpisodeEnd,
            actor: "system".to_string(),
            action: "ended_episode".to_string(),
            data: serde_json::json!({
                "outcome": outcome,
                "duration": duration_secs,
                "event_count": self.events.len() + 1,
            }),
            impact_score: 0.5,
        });

        let user_messages = self.count_events(EventType::UserMessage);
        let assistant_messages = self.count_events(EventType::AssistantResponse);
        let impacts: Vec<f32> = self
            .events
            .iter()
            .filter(|e| !e.event_type.is_lifecycle())
            .map(|e| e.impact_score)
            .collect();
        let mean_impact = if impacts.is_empty() {
            0.0
        } else {
            impacts.iter().sum::<f32>() / impacts.len() as f32
        };

        let metrics = EpisodeMetrics {
            episode_id: self.id,
            outcome: outcome.clone(),
            closed_at,
            duration_secs,
            event_count: self.events.len(),
            user_messages,
            assistant_messages,
            mean_impact,
            memories_created: self.memories_created.clone(),
        };

        self.status = EpisodeStatus::Closed;
        self.end_time = Some(closed_at);
        self.last_event_at = closed_at;
        self.outcome = Some(outcome);
        self.summary = Some(self.generate_summary());
        self.metrics = Some(metrics.clone());
        metrics
    }

    /// Outcome and metric backfill; the only mutation allowed after close.
    pub fn backfill(&mut self, outcome: Option<String>, success_metrics: HashMap<String, f32>) {
        if let Some(outcome) = outcome {
            if let Some(metrics) = self.metrics.as_mut() {
                metrics.outcome = outcome.clone();
            }
            self.outcome = Some(outcome);
        }
        self.success_metrics.extend(success_metrics);
    }

    pub fn count_events(&self, event_type: EventType) -> usize {
        self.events.iter().filter(|e| e.event_type == event_type).count()
    }

    /// One-line description used for search and long-term consolidation
    pub fn generate_summary(&self) -> String {
        let duration = match self.end_time {
            Some(end) => format!("{}s", (end - self.start_time).num_seconds()),
            None => "ongoing".to_string(),
        };
        let participants: Vec<&str> = self.participants.iter().map(String::as_str).collect();
        let mut parts = vec![
            format!("Episode: {}", self.title),
            format!("Type: {}", self.episode_type),
            format!("Duration: {}", duration),
            format!("Participants: {}", participants.join(", ")),
            format!("Events: {}", self.events.len()),
            format!("Outcome: {}", self.outcome.as_deref().unwrap_or("unknown")),
        ];
        if let Some(first) = self.conversation_history().into_iter().next() {
            parts.push(format!("Opened with: {}", truncate_chars(&first.content, 120)));
        }
        parts.join(" | ")
    }

    /// Text that represents this episode in the semantic index
    pub fn embedding_text(&self) -> String {
        format!(
            "{}\n{}",
            self.title,
            self.summary.clone().unwrap_or_else(|| self.generate_summary())
        )
    }

    /// User/assistant turns in order
    pub fn conversation_history(&self) -> Vec<ConversationTurn> {
        self.events
            .iter()
            .filter(|e| e.event_type.is_message())
            .map(|e| ConversationTurn {
                role: if e.event_type == EventType::UserMessage {
                    "user".to_string()
                } else {
                    "assistant".to_string()
                },
                content: event_content(e).to_string(),
                timestamp: e.timestamp,
            })
            .collect()
    }
}

/// A user or assistant message extracted from an episode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Message text carried in an event's `data.content`, if any
pub fn event_content(event: &Event) -> &str {
    event
        .data
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or_default()
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
