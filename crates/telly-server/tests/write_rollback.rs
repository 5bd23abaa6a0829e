mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use telly::{
    Clock, DistanceMetric, DomainError, EmbeddingService, MemoryItem, MemoryRepository,
    ScoredId, VectorIndex,
};
use telly_server::adapters::{
    sqlite, InProcessVectorIndex, SqliteMemoryRepository, SqliteTranscriptRepository,
};
use telly_server::application::{Deadline, LongTermService, SaveTranscript, TranscriptService};

use common::{harness, Harness, DIMENSION};

/// In-process index whose writes can be switched to fail
struct FlakyIndex {
    inner: InProcessVectorIndex,
    fail_add: AtomicBool,
    fail_remove: AtomicBool,
}

impl FlakyIndex {
    fn new() -> Self {
        Self {
            inner: InProcessVectorIndex::new(DIMENSION, DistanceMetric::Cosine, None),
            fail_add: AtomicBool::new(false),
            fail_remove: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl VectorIndex for FlakyIndex {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn metric(&self) -> DistanceMetric {
        self.inner.metric()
    }

    fn backend(&self) -> &'static str {
        "flaky"
    }

    async fn add(&self, id: &str, vector: Vec<f32>) -> Result<(), DomainError> {
        if self.fail_add.load(Ordering::SeqCst) {
            return Err(DomainError::ExternalService("index add refused".into()));
        }
        self.inner.add(id, vector).await
    }

    async fn remove(&self, id: &str) -> Result<bool, DomainError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(DomainError::ExternalService("index remove refused".into()));
        }
        self.inner.remove(id).await
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredId>, DomainError> {
        self.inner.search(vector, k).await
    }

    async fn ids(&self) -> Result<Vec<String>, DomainError> {
        self.inner.ids().await
    }

    async fn len(&self) -> Result<usize, DomainError> {
        self.inner.len().await
    }

    async fn persist(&self) -> Result<(), DomainError> {
        self.inner.persist().await
    }

    async fn load(&self) -> Result<(), DomainError> {
        self.inner.load().await
    }
}

/// SQLite memory repository whose writes can be switched to fail
struct FlakyMemoryRepository {
    inner: SqliteMemoryRepository,
    fail_upsert: AtomicBool,
    fail_delete: AtomicBool,
}

#[async_trait]
impl MemoryRepository for FlakyMemoryRepository {
    async fn upsert(&self, item: &MemoryItem) -> Result<(), DomainError> {
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(DomainError::Repository("disk full".into()));
        }
        self.inner.upsert(item).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<MemoryItem>, DomainError> {
        self.inner.find_by_id(id).await
    }

    async fn find_all(&self) -> Result<Vec<MemoryItem>, DomainError> {
        self.inner.find_all().await
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(DomainError::Repository("disk full".into()));
        }
        self.inner.delete(id).await
    }
}

struct Store {
    h: Harness,
    repo: Arc<FlakyMemoryRepository>,
    index: Arc<FlakyIndex>,
    long_term: LongTermService<FlakyMemoryRepository>,
}

async fn store() -> Store {
    let h = harness().await;
    let pool = sqlite::connect(&h.config.database_url).await.unwrap();
    let repo = Arc::new(FlakyMemoryRepository {
        inner: SqliteMemoryRepository::new(pool),
        fail_upsert: AtomicBool::new(false),
        fail_delete: AtomicBool::new(false),
    });
    let index = Arc::new(FlakyIndex::new());
    let embedder: Arc<dyn EmbeddingService> = h.embedder.clone();
    let clock: Arc<dyn Clock> = h.clock.clone();
    let long_term = LongTermService::new(
        repo.clone(),
        index.clone(),
        embedder,
        clock,
        Deadline::new(h.config.backend_timeout),
    );
    long_term.load().await.unwrap();
    Store {
        h,
        repo,
        index,
        long_term,
    }
}

fn vector(seed: f32) -> Vec<f32> {
    (0..DIMENSION).map(|i| seed + i as f32 * 0.01).collect()
}

#[tokio::test]
async fn test_failed_index_add_stores_nothing() {
    let s = store().await;
    s.index.fail_add.store(true, Ordering::SeqCst);

    let item = MemoryItem::new("never indexed", s.h.clock.now());
    let id = item.id.clone();
    assert!(s.long_term.put(item, vector(0.1)).await.is_err());

    assert!(s.long_term.get(&id).await.unwrap().is_none());
    assert_eq!(s.long_term.len().await.unwrap(), 0);
    assert_eq!(s.index.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_record_write_drops_new_vector() {
    let s = store().await;
    s.repo.fail_upsert.store(true, Ordering::SeqCst);

    let item = MemoryItem::new("record write fails", s.h.clock.now());
    assert!(s.long_term.put(item, vector(0.2)).await.is_err());
    assert_eq!(s.index.len().await.unwrap(), 0);

    let candidate = MemoryItem::new("consolidate fails", s.h.clock.now());
    assert!(s.long_term.consolidate(&candidate, Some(vector(0.3))).await.is_err());
    assert_eq!(s.index.len().await.unwrap(), 0);
    assert_eq!(s.long_term.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_overwrite_restores_previous_vector() {
    let s = store().await;
    let item = MemoryItem::new("original", s.h.clock.now());
    let stored = s.long_term.put(item, vector(0.1)).await.unwrap();

    s.repo.fail_upsert.store(true, Ordering::SeqCst);
    let mut edited = stored.clone();
    edited.content = "edited".to_string();
    assert!(s.long_term.put(edited, vector(0.9)).await.is_err());

    let hits = s.index.search(&vector(0.1), 1).await.unwrap();
    assert_eq!(hits[0].id, stored.id);
    assert!(hits[0].score > 0.999);
    let record = s.long_term.get(&stored.id).await.unwrap().unwrap();
    assert_eq!(record.content, "original");
}

#[tokio::test]
async fn test_failed_record_delete_keeps_vector() {
    let s = store().await;
    let item = MemoryItem::new("stays put", s.h.clock.now());
    let stored = s.long_term.put(item, vector(0.4)).await.unwrap();

    s.repo.fail_delete.store(true, Ordering::SeqCst);
    assert!(s.long_term.remove(&stored.id).await.is_err());
    assert!(s.long_term.get(&stored.id).await.unwrap().is_some());
    assert_eq!(s.index.ids().await.unwrap(), vec![stored.id.clone()]);

    s.repo.fail_delete.store(false, Ordering::SeqCst);
    s.index.fail_remove.store(true, Ordering::SeqCst);
    assert!(s.long_term.remove(&stored.id).await.is_err());
    assert!(s.long_term.get(&stored.id).await.unwrap().is_some());
    assert_eq!(s.index.len().await.unwrap(), 1);

    s.index.fail_remove.store(false, Ordering::SeqCst);
    assert!(s.long_term.remove(&stored.id).await.unwrap());
    assert_eq!(s.index.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_transcript_not_saved_when_index_add_fails() {
    let h = harness().await;
    let pool = sqlite::connect(&h.config.database_url).await.unwrap();
    let index = Arc::new(FlakyIndex::new());
    let embedder: Arc<dyn EmbeddingService> = h.embedder.clone();
    let clock: Arc<dyn Clock> = h.clock.clone();
    let transcripts = TranscriptService::new(
        Arc::new(SqliteTranscriptRepository::new(pool)),
        index.clone(),
        embedder,
        clock,
        Deadline::new(h.config.backend_timeout),
    );

    index.fail_add.store(true, Ordering::SeqCst);
    let result = transcripts
        .save(SaveTranscript {
            url: "https://youtu.be/flaky".to_string(),
            title: "Flaky index".to_string(),
            transcript: "this should not be stored".to_string(),
            action_plan: String::new(),
            summary: None,
        })
        .await;
    assert!(result.is_err());
    assert!(transcripts
        .get_by_url("https://youtu.be/flaky")
        .await
        .unwrap()
        .is_none());
    assert_eq!(index.len().await.unwrap(), 0);
}
