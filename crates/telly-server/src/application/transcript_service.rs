//! Transcript Store (Use Case)
//!
//! Upserts transcripts by URL and serves semantic search with an explicit
//! keyword fallback.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use telly::domain::services::{cmp_score_desc, field_score};
use telly::{
    Clock, DomainError, EmbeddingService, SearchMode, TranscriptRecord, TranscriptRepository,
    VectorIndex,
};

use super::consistency::{reconcile, ConsistencyReport};
use super::locks::KeyedLocks;
use super::Deadline;

/// Input for `save`
#[derive(Debug, Clone, Default)]
pub struct SaveTranscript {
    pub url: String,
    pub title: String,
    pub transcript: String,
    pub action_plan: String,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptHit {
    pub record: TranscriptRecord,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptSearch {
    pub mode: SearchMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
    pub hits: Vec<TranscriptHit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranscriptStats {
    pub total: usize,
    /// Records with a usable embedding
    pub embedded: usize,
    pub vectors: usize,
    pub latest_update: Option<DateTime<Utc>>,
}

pub struct TranscriptService<R: TranscriptRepository> {
    repo: Arc<R>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingService>,
    clock: Arc<dyn Clock>,
    deadline: Deadline,
    url_locks: KeyedLocks<String>,
    verified: RwLock<Option<ConsistencyReport>>,
}

impl<R: TranscriptRepository> TranscriptService<R> {
    pub fn new(
        repo: Arc<R>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingService>,
        clock: Arc<dyn Clock>,
        deadline: Deadline,
    ) -> Self {
        Self {
            repo,
            index,
            embedder,
            clock,
            deadline,
            url_locks: KeyedLocks::new(),
            verified: RwLock::new(None),
        }
    }

    pub async fn load(&self) -> Result<ConsistencyReport, DomainError> {
        let mut verified = self.verified.write().await;
        let records = self
            .deadline
            .run("transcripts.find_all", || self.repo.find_all())
            .await?;
        let records = records
            .into_iter()
            .map(|r| (r.id.to_string(), r.embedding))
            .collect();
        let report = reconcile("transcripts", self.index.as_ref(), &self.deadline, records).await?;
        *verified = Some(report.clone());
        Ok(report)
    }

    async fn ensure_loaded(&self) -> Result<(), DomainError> {
        if self.verified.read().await.is_none() {
            self.load().await?;
        }
        Ok(())
    }

    /// Upsert by URL. A re-save keeps the id and creation time and overwrites
    /// everything else. When the embedding backend fails the record is kept
    /// without a vector.
    pub async fn save(&self, input: SaveTranscript) -> Result<Uuid, DomainError> {
        let url = input.url.trim().to_string();
        if url.is_empty() {
            return Err(DomainError::Validation("url is required".into()));
        }
        if input.transcript.trim().is_empty() {
            return Err(DomainError::Validation("transcript text is required".into()));
        }
        self.ensure_loaded().await?;
        let _guard = self.url_locks.lock(&url).await;

        let fresh = TranscriptRecord::new(
            url.clone(),
            input.title,
            input.transcript,
            input.action_plan,
            input.summary,
            self.clock.now(),
        );
        let existing = self
            .deadline
            .run("transcripts.find_by_url", || self.repo.find_by_url(&url))
            .await?;
        let mut previous_embedding = Vec::new();
        let mut record = match existing {
            Some(mut stored) => {
                previous_embedding = std::mem::take(&mut stored.embedding);
                stored.overwrite_with(fresh);
                stored
            }
            None => fresh,
        };

        let text = record.embedding_text();
        let embedded = self
            .deadline
            .run("embedding", || self.embedder.embed(&text))
            .await
            .and_then(|v| DomainError::check_dimension(self.index.dimension(), &v).map(|_| v));
        match embedded {
            Ok(embedding) => record.embedding = embedding,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Transcript saved without embedding");
                record.embedding = Vec::new();
            }
        }

        // Vector first; a failed record write restores the previous vector
        let id = record.id.to_string();
        self.set_vector(&id, &record.embedding).await?;
        if let Err(e) = self
            .deadline
            .run("transcripts.save", || self.repo.save(&record))
            .await
        {
            if let Err(rollback) = self.set_vector(&id, &previous_embedding).await {
                tracing::error!(transcript_id = %id, error = %rollback, "Vector rollback failed; next load reconciles it");
            }
            return Err(e);
        }
        if let Err(e) = self
            .deadline
            .run("vector.persist", || self.index.persist())
            .await
        {
            tracing::warn!(error = %e, "Vector snapshot not persisted");
        }

        tracing::info!(transcript_id = %record.id, url = %url, "Transcript saved");
        Ok(record.id)
    }

    /// An empty embedding drops the vector; a stale one no longer matches
    async fn set_vector(&self, id: &str, embedding: &[f32]) -> Result<(), DomainError> {
        if embedding.is_empty() {
            self.deadline
                .run("vector.remove", || self.index.remove(id))
                .await
                .map(|_| ())
        } else {
            self.deadline
                .run("vector.add", || self.index.add(id, embedding.to_vec()))
                .await
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<TranscriptRecord>, DomainError> {
        self.deadline
            .run("transcripts.find_by_id", || self.repo.find_by_id(id))
            .await
    }

    pub async fn get_by_url(&self, url: &str) -> Result<Option<TranscriptRecord>, DomainError> {
        self.deadline
            .run("transcripts.find_by_url", || self.repo.find_by_url(url))
            .await
    }

    /// Most recently updated first
    pub async fn recent(&self, limit: usize) -> Result<Vec<TranscriptRecord>, DomainError> {
        self.deadline
            .run("transcripts.find_recent", || self.repo.find_recent(limit))
            .await
    }

    pub async fn stats(&self) -> Result<TranscriptStats, DomainError> {
        self.ensure_loaded().await?;
        let records = self
            .deadline
            .run("transcripts.find_all", || self.repo.find_all())
            .await?;
        let vectors = self.deadline.run("vector.len", || self.index.len()).await?;
        Ok(TranscriptStats {
            total: records.len(),
            embedded: records.iter().filter(|r| !r.embedding.is_empty()).count(),
            vectors,
            latest_update: records.iter().map(|r| r.updated_at).max(),
        })
    }

    /// Semantic search; on embedding or index failure, keyword search over
    /// title, summary, action plan and transcript, tagged as degraded.
    pub async fn search(&self, query: &str, limit: usize) -> Result<TranscriptSearch, DomainError> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(TranscriptSearch {
                mode: SearchMode::Semantic,
                degraded_reason: None,
                hits: Vec::new(),
            });
        }

        match self.semantic_search(query, limit).await {
            Ok(hits) => Ok(TranscriptSearch {
                mode: SearchMode::Semantic,
                degraded_reason: None,
                hits,
            }),
            Err(e) if e.is_backend_failure() => {
                tracing::warn!(error = %e, "Transcript search degraded to keyword matching");
                let hits = self.keyword_search(query, limit).await?;
                Ok(TranscriptSearch {
                    mode: SearchMode::Keyword,
                    degraded_reason: Some(e.to_string()),
                    hits,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn semantic_search(&self, query: &str, limit: usize) -> Result<Vec<TranscriptHit>, DomainError> {
        self.ensure_loaded().await?;
        let embedding = self
            .deadline
            .run("embedding", || self.embedder.embed(query))
            .await?;
        let _snapshot = self.verified.read().await;
        let hits = self
            .deadline
            .run("vector.search", || self.index.search(&embedding, limit))
            .await?;
        self.resolve(hits.into_iter().map(|h| (h.id, h.score))).await
    }

    async fn resolve(
        &self,
        hits: impl Iterator<Item = (String, f32)>,
    ) -> Result<Vec<TranscriptHit>, DomainError> {
        let mut results = Vec::new();
        for (id, score) in hits {
            let Ok(uuid) = Uuid::parse_str(&id) else {
                tracing::warn!(vector_id = %id, "Skipping non-transcript vector id");
                continue;
            };
            if let Some(record) = self.get(uuid).await? {
                results.push(TranscriptHit { record, score });
            }
        }
        Ok(results)
    }

    async fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<TranscriptHit>, DomainError> {
        let records = self
            .deadline
            .run("transcripts.find_all", || self.repo.find_all())
            .await?;
        let mut hits: Vec<TranscriptHit> = records
            .into_iter()
            .filter_map(|record| {
                let score = field_score(query, &record.keyword_fields());
                (score > 0.0).then_some(TranscriptHit { record, score })
            })
            .collect();
        hits.sort_by(|a, b| {
            cmp_score_desc(a.score, b.score).then_with(|| b.record.updated_at.cmp(&a.record.updated_at))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    /// Nearest transcripts to `id`, excluding itself
    pub async fn related(&self, id: Uuid, limit: usize) -> Result<Vec<TranscriptHit>, DomainError> {
        let record = self
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Transcript", id))?;
        if record.embedding.is_empty() {
            return Err(DomainError::DegradedSearch(format!(
                "transcript {} has no embedding",
                id
            )));
        }
        self.ensure_loaded().await?;
        let _snapshot = self.verified.read().await;
        let hits = self
            .deadline
            .run("vector.search", || self.index.search(&record.embedding, limit + 1))
            .await?;
        let own = id.to_string();
        let mut related = self
            .resolve(hits.into_iter().filter(|h| h.id != own).map(|h| (h.id, h.score)))
            .await?;
        related.truncate(limit);
        Ok(related)
    }
}
