//! TranscriptRecord - A processed video transcript with its action plan
//!
//! Pure domain entity without infrastructure dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::episode::truncate_chars;

/// Characters of transcript used as a summary when none is supplied
pub const SUMMARY_CHARS: usize = 500;

/// Saved transcript. One record per source URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptRecord {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub transcript_text: String,
    pub action_plan: String,
    pub summary: String,
    /// Empty when the embedding backend was unavailable at save time
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TranscriptRecord {
    /// Stable id for a URL, so an upsert never mints a second id
    pub fn id_for_url(url: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, url.trim().as_bytes())
    }

    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        transcript_text: impl Into<String>,
        action_plan: impl Into<String>,
        summary: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let url = url.into();
        let transcript_text = transcript_text.into();
        let summary = summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| truncate_chars(&transcript_text, SUMMARY_CHARS));
        Self {
            id: Self::id_for_url(&url),
            url,
            title: title.into(),
            transcript_text,
            action_plan: action_plan.into(),
            summary,
            embedding: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the content fields with those of a re-save, keeping the
    /// identity and creation time of the stored record.
    pub fn overwrite_with(&mut self, newer: TranscriptRecord) {
        self.title = newer.title;
        self.transcript_text = newer.transcript_text;
        self.action_plan = newer.action_plan;
        self.summary = newer.summary;
        self.embedding = newer.embedding;
        self.updated_at = newer.updated_at.max(self.created_at);
    }

    /// Text the embedding is computed from
    pub fn embedding_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.transcript_text)
    }

    /// Fields searched by the keyword fallback, in descending weight
    pub fn keyword_fields(&self) -> [&str; 4] {
        [
            &self.title,
            &self.summary,
            &self.action_plan,
            &self.transcript_text,
        ]
    }
}
