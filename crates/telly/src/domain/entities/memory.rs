//! MemoryItem - A captured piece of conversation knowledge
//!
//! Pure domain entity without infrastructure dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{MemoryPriority, MemorySource};

/// MemoryItem - lives in a session's short-term buffer and, once accessed
/// often enough, in the long-term store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryItem {
    /// Unique identifier for the memory
    pub id: String,
    /// Session that captured this memory, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// The content/text of the memory
    pub content: String,
    /// Embedding vector; empty until the item is embedded for promotion
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// When this memory was created
    pub created_at: DateTime<Utc>,
    /// Last retrieval time
    pub last_accessed_at: DateTime<Utc>,
    /// Number of retrievals (never decreases)
    pub access_count: u32,
    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,
    /// Optional emotional colouring of the interaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion_tag: Option<String>,
    #[serde(default)]
    pub priority: MemoryPriority,
    #[serde(default)]
    pub source: MemorySource,
}

impl MemoryItem {
    /// Create a new memory with generated ID and timestamp
    pub fn new(content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: None,
            content: content.into(),
            embedding: Vec::new(),
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            tags: Vec::new(),
            emotion_tag: None,
            priority: MemoryPriority::default(),
            source: MemorySource::default(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_emotion(mut self, emotion_tag: Option<String>) -> Self {
        self.emotion_tag = emotion_tag;
        self
    }

    pub fn with_priority(mut self, priority: MemoryPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_source(mut self, source: MemorySource) -> Self {
        self.source = source;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Record one retrieval
    pub fn record_access(&mut self, now: DateTime<Utc>) {
        self.access_count = self.access_count.saturating_add(1);
        if now > self.last_accessed_at {
            self.last_accessed_at = now;
        }
    }

    /// Fold a fresher copy of the same memory into this one without ever
    /// moving access bookkeeping backwards.
    pub fn refresh_from(&mut self, other: &MemoryItem) {
        self.access_count = self.access_count.max(other.access_count);
        if other.last_accessed_at > self.last_accessed_at {
            self.last_accessed_at = other.last_accessed_at;
        }
        for tag in &other.tags {
            if !self.tags.contains(tag) {
                self.tags.push(tag.clone());
            }
        }
        if other.emotion_tag.is_some() {
            self.emotion_tag = other.emotion_tag.clone();
        }
        self.priority = self.priority.max(other.priority);
    }
}
