//! Long-Term Store (Use Case)
//!
//! Durable memory records plus their vectors. Writes are serialized per
//! record id; searches share a read lock that only `load` takes exclusively,
//! so no search runs against an index that has not been verified.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use telly::domain::services::cmp_score_desc;
use telly::{
    Clock, DomainError, EmbeddingService, MemoryItem, MemoryPriority, MemoryRepository,
    MemorySearchFilter, MemorySource, VectorIndex,
};

use super::consistency::{reconcile, ConsistencyReport};
use super::locks::KeyedLocks;
use super::Deadline;

/// Result of an idempotent consolidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Consolidation {
    Inserted,
    Refreshed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMemory {
    pub item: MemoryItem,
    pub score: f32,
}

/// Application service for the long-term store
pub struct LongTermService<R: MemoryRepository> {
    repo: Arc<R>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingService>,
    clock: Arc<dyn Clock>,
    deadline: Deadline,
    write_locks: KeyedLocks<String>,
    verified: RwLock<Option<ConsistencyReport>>,
}

impl<R: MemoryRepository> LongTermService<R> {
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
            write_locks: KeyedLocks::new(),
            verified: RwLock::new(None),
        }
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Reload records and the index snapshot, repairing the id/vector
    /// correspondence before any search is served.
    pub async fn load(&self) -> Result<ConsistencyReport, DomainError> {
        let mut verified = self.verified.write().await;
        let records = self
            .deadline
            .run("memories.find_all", || self.repo.find_all())
            .await?;
        let records = records.into_iter().map(|m| (m.id, m.embedding)).collect();
        let report = reconcile("long_term", self.index.as_ref(), &self.deadline, records).await?;
        *verified = Some(report.clone());
        Ok(report)
    }

    async fn ensure_loaded(&self) -> Result<(), DomainError> {
        if self.verified.read().await.is_none() {
            self.load().await?;
        }
        Ok(())
    }

    /// Durable write of `item` with its embedding
    pub async fn put(&self, mut item: MemoryItem, embedding: Vec<f32>) -> Result<MemoryItem, DomainError> {
        DomainError::check_dimension(self.dimension(), &embedding)?;
        if item.content.trim().is_empty() {
            return Err(DomainError::Validation("memory content is required".into()));
        }
        self.ensure_loaded().await?;

        let _guard = self.write_locks.lock(&item.id).await;
        let previous = self.get(&item.id).await?;
        item.embedding = embedding;
        self.write(&item, previous.as_ref()).await?;

        tracing::debug!(memory_id = %item.id, "Memory stored in long-term store");
        Ok(item)
    }

    /// Embed `content` and store it directly as a long-term memory
    pub async fn remember(
        &self,
        content: String,
        session_id: Option<String>,
        tags: Vec<String>,
        priority: MemoryPriority,
    ) -> Result<MemoryItem, DomainError> {
        let mut item = MemoryItem::new(content, self.clock.now())
            .with_tags(tags)
            .with_priority(priority)
            .with_source(MemorySource::Direct);
        item.session_id = session_id;
        let embedding = self.embed(&item.content).await?;
        self.put(item, embedding).await
    }

    /// Idempotent upsert. A candidate whose id is already stored only
    /// refreshes metadata; otherwise it is embedded (if no embedding is
    /// supplied or carried) and inserted.
    pub async fn consolidate(
        &self,
        candidate: &MemoryItem,
        embedding: Option<Vec<f32>>,
    ) -> Result<(Consolidation, MemoryItem), DomainError> {
        self.ensure_loaded().await?;
        let _guard = self.write_locks.lock(&candidate.id).await;

        let existing = self
            .deadline
            .run("memories.find_by_id", || self.repo.find_by_id(&candidate.id))
            .await?;

        if let Some(mut stored) = existing {
            stored.refresh_from(candidate);
            self.deadline
                .run("memories.upsert", || self.repo.upsert(&stored))
                .await?;
            tracing::debug!(memory_id = %stored.id, access_count = stored.access_count, "Consolidate refreshed existing memory");
            return Ok((Consolidation::Refreshed, stored));
        }

        let embedding = match embedding {
            Some(embedding) => embedding,
            None if !candidate.embedding.is_empty() => candidate.embedding.clone(),
            None => self.embed(&candidate.content).await?,
        };
        DomainError::check_dimension(self.dimension(), &embedding)?;

        let mut item = candidate.clone();
        item.embedding = embedding;
        self.write(&item, None).await?;

        tracing::info!(memory_id = %item.id, access_count = item.access_count, "Memory consolidated into long-term store");
        Ok((Consolidation::Inserted, item))
    }

    /// Vector first, then the record. A failed record write puts back the
    /// vector `previous` carried, so an error leaves ids and vectors paired.
    async fn write(&self, item: &MemoryItem, previous: Option<&MemoryItem>) -> Result<(), DomainError> {
        self.deadline
            .run("vector.add", || self.index.add(&item.id, item.embedding.clone()))
            .await?;
        if let Err(e) = self
            .deadline
            .run("memories.upsert", || self.repo.upsert(item))
            .await
        {
            self.restore_vector(&item.id, previous).await;
            return Err(e);
        }
        self.persist_index().await;
        Ok(())
    }

    async fn restore_vector(&self, id: &str, previous: Option<&MemoryItem>) {
        let restored = match previous.filter(|p| !p.embedding.is_empty()) {
            Some(p) => {
                self.deadline
                    .run("vector.add", || self.index.add(id, p.embedding.clone()))
                    .await
            }
            None => self
                .deadline
                .run("vector.remove", || self.index.remove(id))
                .await
                .map(|_| ()),
        };
        if let Err(e) = restored {
            tracing::error!(memory_id = %id, error = %e, "Vector rollback failed; next load reconciles it");
        }
    }

    // Records carry their embeddings, so a lagging snapshot is repaired by
    // the reindex on the next load.
    async fn persist_index(&self) {
        if let Err(e) = self
            .deadline
            .run("vector.persist", || self.index.persist())
            .await
        {
            tracing::warn!(error = %e, "Vector snapshot not persisted");
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        self.deadline
            .run("embedding", || self.embedder.embed(text))
            .await
    }

    /// Nearest memories by descending similarity; ties go to the most
    /// recently accessed. Fewer stored items than `top_k` yields them all.
    pub async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: &MemorySearchFilter,
    ) -> Result<Vec<ScoredMemory>, DomainError> {
        DomainError::check_dimension(self.dimension(), query_embedding)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }
        self.ensure_loaded().await?;
        let _snapshot = self.verified.read().await;

        // Overfetch so that ties at the cut and filtered-out items do not
        // starve the result.
        let fetch = if filter.is_empty() {
            top_k.saturating_mul(4)
        } else {
            self.deadline.run("vector.len", || self.index.len()).await?
        };
        let hits = self
            .deadline
            .run("vector.search", || self.index.search(query_embedding, fetch))
            .await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let record = self
                .deadline
                .run("memories.find_by_id", || self.repo.find_by_id(&hit.id))
                .await?;
            match record {
                Some(item) if filter.matches(&item) => results.push(ScoredMemory {
                    item,
                    score: hit.score,
                }),
                Some(_) => {}
                None => tracing::warn!(memory_id = %hit.id, "Vector without record skipped"),
            }
        }

        results.sort_by(|a, b| {
            cmp_score_desc(a.score, b.score)
                .then_with(|| b.item.last_accessed_at.cmp(&a.item.last_accessed_at))
        });
        results.truncate(top_k);
        Ok(results)
    }

    /// Embed `query` and search. Embedding failures surface as
    /// `DegradedSearch` so callers can fall back.
    pub async fn search_text(
        &self,
        query: &str,
        top_k: usize,
        filter: &MemorySearchFilter,
    ) -> Result<Vec<ScoredMemory>, DomainError> {
        let embedding = self
            .embed(query)
            .await
            .map_err(|e| DomainError::DegradedSearch(e.to_string()))?;
        self.search(&embedding, top_k, filter).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<MemoryItem>, DomainError> {
        self.deadline
            .run("memories.find_by_id", || self.repo.find_by_id(id))
            .await
    }

    /// Record a retrieval of a stored memory
    pub async fn recall(&self, id: &str) -> Result<MemoryItem, DomainError> {
        let _guard = self.write_locks.lock(&id.to_string()).await;
        let mut item = self
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found_str("Memory", id))?;
        item.record_access(self.clock.now());
        self.deadline
            .run("memories.upsert", || self.repo.upsert(&item))
            .await?;
        Ok(item)
    }

    /// Forget a memory. Returns false when it was not stored.
    pub async fn remove(&self, id: &str) -> Result<bool, DomainError> {
        self.ensure_loaded().await?;
        let _guard = self.write_locks.lock(&id.to_string()).await;
        let record = self.get(id).await?;
        let unindexed = self
            .deadline
            .run("vector.remove", || self.index.remove(id))
            .await?;
        let deleted = match self
            .deadline
            .run("memories.delete", || self.repo.delete(id))
            .await
        {
            Ok(deleted) => deleted,
            Err(e) => {
                if unindexed {
                    self.restore_vector(id, record.as_ref()).await;
                }
                return Err(e);
            }
        };
        if unindexed {
            self.persist_index().await;
        }
        if deleted {
            tracing::info!(memory_id = %id, "Memory forgotten");
        }
        Ok(deleted)
    }

    pub async fn len(&self) -> Result<usize, DomainError> {
        Ok(self
            .deadline
            .run("memories.find_all", || self.repo.find_all())
            .await?
            .len())
    }
}
