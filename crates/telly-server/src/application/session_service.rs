//! Session Memory (Use Case)
//!
//! Owns one short-term buffer per session and promotes items into the
//! long-term store once they have been retrieved often enough. Eviction and
//! promotion are independent: an evicted item that was promoted stays in the
//! long-term store, and a failed promotion leaves the item in short-term.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use telly::{
    Clock, DomainError, MemoryItem, MemoryPriority, MemoryRepository, MemorySource,
    ShortTermBuffer,
};

use super::long_term_service::{Consolidation, LongTermService};

/// Per-request view of a session, carrying the memory toggle explicitly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
    pub memory_enabled: bool,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, memory_enabled: bool) -> Self {
        Self {
            session_id: session_id.into(),
            memory_enabled,
        }
    }
}

/// Input for capturing a memory from a chat turn
#[derive(Debug, Clone, Default)]
pub struct Capture {
    pub content: String,
    pub tags: Vec<String>,
    pub emotion_tag: Option<String>,
    pub priority: MemoryPriority,
}

impl Capture {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// A retrieval and whether it triggered a promotion
#[derive(Debug, Clone)]
pub struct Recall {
    pub item: MemoryItem,
    pub promotion: Option<Consolidation>,
}

pub struct SessionMemoryService<R: MemoryRepository> {
    buffers: RwLock<HashMap<String, Arc<Mutex<ShortTermBuffer>>>>,
    capacity: usize,
    consolidation_threshold: u32,
    long_term: Arc<LongTermService<R>>,
    clock: Arc<dyn Clock>,
}

impl<R: MemoryRepository> SessionMemoryService<R> {
    pub fn new(
        capacity: usize,
        consolidation_threshold: u32,
        long_term: Arc<LongTermService<R>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            buffers: RwLock::new(HashMap::new()),
            capacity,
            consolidation_threshold,
            long_term,
            clock,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    async fn buffer(&self, session_id: &str) -> Arc<Mutex<ShortTermBuffer>> {
        if let Some(buffer) = self.buffers.read().await.get(session_id) {
            return buffer.clone();
        }
        self.buffers
            .write()
            .await
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ShortTermBuffer::new(self.capacity))))
            .clone()
    }

    async fn existing_buffer(&self, session_id: &str) -> Option<Arc<Mutex<ShortTermBuffer>>> {
        self.buffers.read().await.get(session_id).cloned()
    }

    /// Capture a memory into the session's buffer. Returns `None` when memory
    /// is disabled for this context.
    pub async fn capture(
        &self,
        ctx: &SessionContext,
        capture: Capture,
    ) -> Result<Option<MemoryItem>, DomainError> {
        if !ctx.memory_enabled {
            return Ok(None);
        }
        if capture.content.trim().is_empty() {
            return Err(DomainError::Validation("memory content is required".into()));
        }

        let item = MemoryItem::new(capture.content, self.clock.now())
            .with_session(ctx.session_id.clone())
            .with_tags(capture.tags)
            .with_emotion(capture.emotion_tag)
            .with_priority(capture.priority)
            .with_source(MemorySource::Interaction);

        let buffer = self.buffer(&ctx.session_id).await;
        if let Some(evicted) = buffer.lock().await.add(item.clone()) {
            tracing::debug!(
                session_id = %ctx.session_id,
                memory_id = %evicted.id,
                access_count = evicted.access_count,
                "Evicted oldest short-term memory"
            );
        }
        Ok(Some(item))
    }

    /// Last `k` items, most recent first. Reading recents is not a retrieval.
    pub async fn recent(&self, ctx: &SessionContext, k: usize) -> Vec<MemoryItem> {
        if !ctx.memory_enabled {
            return Vec::new();
        }
        match self.existing_buffer(&ctx.session_id).await {
            Some(buffer) => buffer.lock().await.get_recent(k),
            None => Vec::new(),
        }
    }

    /// Retrieve one item, counting the access. Reaching the consolidation
    /// threshold promotes the item; promotion is an idempotent consolidate,
    /// so later accesses only refresh the long-term copy.
    pub async fn recall(&self, ctx: &SessionContext, id: &str) -> Result<Recall, DomainError> {
        if !ctx.memory_enabled {
            return Err(DomainError::not_found_str("Memory", id));
        }
        let buffer = self
            .existing_buffer(&ctx.session_id)
            .await
            .ok_or_else(|| DomainError::not_found_str("Session", &ctx.session_id))?;

        // Held through promotion so a concurrent recall of the same item
        // cannot interleave its embedding write.
        let mut buffer = buffer.lock().await;
        let item = buffer
            .touch(id, self.clock.now())
            .ok_or_else(|| DomainError::not_found_str("Memory", id))?;

        let promotion = self.maybe_promote(&mut buffer, &item).await;
        let item = buffer.get(id).cloned().unwrap_or(item);
        Ok(Recall { item, promotion })
    }

    /// Substring search over the session's buffer; every hit counts as a
    /// retrieval.
    pub async fn search(
        &self,
        ctx: &SessionContext,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryItem>, DomainError> {
        if !ctx.memory_enabled {
            return Ok(Vec::new());
        }
        let Some(buffer) = self.existing_buffer(&ctx.session_id).await else {
            return Ok(Vec::new());
        };
        let mut buffer = buffer.lock().await;
        let now = self.clock.now();

        let mut results = Vec::new();
        for hit in buffer.search(query, limit) {
            if let Some(item) = buffer.touch(&hit.id, now) {
                self.maybe_promote(&mut buffer, &item).await;
                results.push(buffer.get(&item.id).cloned().unwrap_or(item));
            }
        }
        Ok(results)
    }

    async fn maybe_promote(
        &self,
        buffer: &mut ShortTermBuffer,
        item: &MemoryItem,
    ) -> Option<Consolidation> {
        if item.access_count < self.consolidation_threshold {
            return None;
        }
        match self.long_term.consolidate(item, None).await {
            Ok((outcome, stored)) => {
                if item.embedding.is_empty() {
                    buffer.set_embedding(&item.id, stored.embedding);
                }
                if outcome == Consolidation::Inserted {
                    tracing::info!(
                        memory_id = %item.id,
                        access_count = item.access_count,
                        "Promoted short-term memory"
                    );
                }
                Some(outcome)
            }
            Err(e) => {
                tracing::warn!(memory_id = %item.id, error = %e, "Promotion failed; memory stays in short-term");
                None
            }
        }
    }

    /// Oldest-first copy of the session's buffer
    pub async fn snapshot(&self, ctx: &SessionContext) -> Vec<MemoryItem> {
        match self.existing_buffer(&ctx.session_id).await {
            Some(buffer) => buffer.lock().await.snapshot(),
            None => Vec::new(),
        }
    }

    /// Drop the session's short-term state; long-term copies are untouched
    pub async fn clear(&self, ctx: &SessionContext) -> usize {
        match self.buffers.write().await.remove(&ctx.session_id) {
            Some(buffer) => buffer.lock().await.len(),
            None => 0,
        }
    }

    /// Drop buffers with no capture or retrieval within `idle`. Buffers
    /// another task currently holds are kept.
    pub async fn evict_idle(&self, idle: chrono::Duration) -> usize {
        let cutoff = self.clock.now() - idle;
        let mut buffers = self.buffers.write().await;
        let before = buffers.len();
        buffers.retain(|_, buffer| {
            if Arc::strong_count(buffer) > 1 {
                return true;
            }
            match buffer.try_lock() {
                Ok(buffer) => buffer.last_activity().is_some_and(|at| at > cutoff),
                Err(_) => true,
            }
        });
        let evicted = before - buffers.len();
        if evicted > 0 {
            tracing::debug!(count = evicted, "Dropped idle session buffers");
        }
        evicted
    }

    pub async fn session_count(&self) -> usize {
        self.buffers.read().await.len()
    }
}
