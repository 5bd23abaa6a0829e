mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use telly::domain::AUTO_CLOSED_OUTCOME;
use telly::{
    Clock, DomainError, EmbeddingService, Episode, EpisodeRepository, EpisodeStatus, EpisodeType,
};
use telly_server::adapters::{sqlite, InProcessVectorIndex, SqliteEpisodeRepository, SqliteMemoryRepository};
use telly_server::application::{Deadline, EpisodeService, StartEpisode};

use common::{harness, Harness, DIMENSION};

/// SQLite episode repository whose saves can be switched to fail
struct FlakyEpisodeRepository {
    inner: SqliteEpisodeRepository,
    fail_save: AtomicBool,
}

#[async_trait]
impl EpisodeRepository for FlakyEpisodeRepository {
    async fn save(&self, episode: &Episode) -> Result<(), DomainError> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(DomainError::Repository("database is locked".into()));
        }
        self.inner.save(episode).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Episode>, DomainError> {
        self.inner.find_by_id(id).await
    }

    async fn find_all(&self) -> Result<Vec<Episode>, DomainError> {
        self.inner.find_all().await
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Vec<Episode>, DomainError> {
        self.inner.find_by_session(session_id).await
    }
}

type Service = EpisodeService<FlakyEpisodeRepository, SqliteMemoryRepository>;

struct Fixture {
    h: Harness,
    repo: Arc<FlakyEpisodeRepository>,
    older: Episode,
    newer: Episode,
}

/// Two ACTIVE episodes persisted for one session, as an interrupted
/// process can leave behind
async fn duplicate_active() -> Fixture {
    let h = harness().await;
    let pool = sqlite::connect(&h.config.database_url).await.unwrap();
    let repo = Arc::new(FlakyEpisodeRepository {
        inner: SqliteEpisodeRepository::new(pool),
        fail_save: AtomicBool::new(false),
    });
    let now = h.clock.now();
    let older = Episode::start(
        "s1",
        EpisodeType::Conversation,
        "Earlier",
        Vec::new(),
        serde_json::Value::Null,
        now - Duration::minutes(10),
    );
    let newer = Episode::start(
        "s1",
        EpisodeType::Conversation,
        "Later",
        Vec::new(),
        serde_json::Value::Null,
        now - Duration::minutes(5),
    );
    repo.save(&older).await.unwrap();
    repo.save(&newer).await.unwrap();
    Fixture {
        h,
        repo,
        older,
        newer,
    }
}

fn service(f: &Fixture) -> Arc<Service> {
    let embedder: Arc<dyn EmbeddingService> = f.h.embedder.clone();
    let clock: Arc<dyn Clock> = f.h.clock.clone();
    EpisodeService::new(
        f.repo.clone(),
        Arc::new(InProcessVectorIndex::new(DIMENSION, f.h.config.vector_metric, None)),
        embedder,
        None,
        clock,
        Deadline::new(f.h.config.backend_timeout),
        f.h.config.idle_timeout,
    )
}

async fn active_in_session(repo: &FlakyEpisodeRepository, session_id: &str) -> Vec<Uuid> {
    repo.find_by_session(session_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.status == EpisodeStatus::Active)
        .map(|e| e.id)
        .collect()
}

#[tokio::test]
async fn test_displaced_episode_blocks_second_active() {
    let f = duplicate_active().await;
    let episodes = service(&f);

    f.repo.fail_save.store(true, Ordering::SeqCst);
    episodes.load().await.unwrap();

    // The older duplicate could not be closed, so no new episode may open
    let err = episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Repository(_)));
    assert_eq!(active_in_session(&f.repo, "s1").await.len(), 2);

    f.repo.fail_save.store(false, Ordering::SeqCst);
    let current = episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();
    assert_eq!(current.id, f.newer.id);
    assert_eq!(active_in_session(&f.repo, "s1").await, vec![f.newer.id]);

    let older = episodes.get(f.older.id).await.unwrap().unwrap();
    assert_eq!(older.status, EpisodeStatus::Closed);
    assert_eq!(older.outcome.as_deref(), Some(AUTO_CLOSED_OUTCOME));
    episodes.shutdown();
}

#[tokio::test]
async fn test_sweep_retries_displaced_episode() {
    let f = duplicate_active().await;
    let episodes = service(&f);

    f.repo.fail_save.store(true, Ordering::SeqCst);
    episodes.load().await.unwrap();
    assert!(episodes.sweep_idle().await.is_empty());

    f.repo.fail_save.store(false, Ordering::SeqCst);
    let closed = episodes.sweep_idle().await;
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].episode_id, f.older.id);
    assert_eq!(active_in_session(&f.repo, "s1").await, vec![f.newer.id]);

    // Nothing left to retry
    assert!(episodes.sweep_idle().await.is_empty());
    episodes.shutdown();
}
