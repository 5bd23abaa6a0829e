//! Episodic Recorder (Use Case)
//!
//! Drives the NEW -> ACTIVE -> CLOSED lifecycle of episodes. Each episode has
//! its own mutex shared by append, close and the idle sweep, and its own
//! idle timer: a tokio task re-armed on every event and aborted on close.
//! Lock order is session start lock, then episode lock, then the brief
//! synchronous maps; nothing holds a synchronous map across an await.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as SyncMutex, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use telly::domain::services::{cmp_score_desc, episode_keyword_score};
use telly::{
    Clock, ConversationTurn, DomainError, EmbeddingService, Episode, EpisodeMetrics,
    EpisodeRepository, EpisodeType, Event, MemoryItem, MemoryRepository, MemorySource, NewEvent,
    SearchMode, VectorIndex,
};

use super::consistency::{reconcile, ConsistencyReport};
use super::locks::KeyedLocks;
use super::long_term_service::LongTermService;
use super::Deadline;

use telly::domain::AUTO_CLOSED_OUTCOME;

/// Parameters for starting an episode
#[derive(Debug, Clone)]
pub struct StartEpisode {
    pub session_id: String,
    pub episode_type: EpisodeType,
    pub title: String,
    pub participants: Vec<String>,
    pub context: serde_json::Value,
}

impl StartEpisode {
    /// Plain conversation episode, as opened by the chat driver
    pub fn conversation(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            episode_type: EpisodeType::Conversation,
            title: "Conversation".to_string(),
            participants: vec!["user".to_string(), "assistant".to_string()],
            context: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EpisodeHit {
    pub episode: Episode,
    pub score: f32,
    pub keyword_score: f32,
    pub semantic_score: Option<f32>,
}

/// Search results tagged with the ranking path that produced them
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeSearch {
    pub mode: SearchMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
    pub hits: Vec<EpisodeHit>,
}

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

pub struct EpisodeService<R: EpisodeRepository, M: MemoryRepository> {
    repo: Arc<R>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingService>,
    long_term: Option<Arc<LongTermService<M>>>,
    clock: Arc<dyn Clock>,
    deadline: Deadline,
    idle_timeout: chrono::Duration,
    episodes: RwLock<HashMap<Uuid, Arc<Mutex<Episode>>>>,
    active_by_session: SyncMutex<HashMap<String, Uuid>>,
    // ACTIVE episodes displaced on load whose close failed, by session
    stranded: SyncMutex<HashMap<Uuid, String>>,
    session_locks: KeyedLocks<String>,
    timers: SyncMutex<HashMap<Uuid, Timer>>,
    next_generation: AtomicU64,
    index_ready: OnceCell<()>,
    me: Weak<Self>,
}

impl<R, M> EpisodeService<R, M>
where
    R: EpisodeRepository + 'static,
    M: MemoryRepository + 'static,
{
    /// `long_term`, when attached, receives each closed episode's summary.
    pub fn new(
        repo: Arc<R>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingService>,
        long_term: Option<Arc<LongTermService<M>>>,
        clock: Arc<dyn Clock>,
        deadline: Deadline,
        idle_timeout: Duration,
    ) -> Arc<Self> {
        let secs = i64::try_from(idle_timeout.as_secs()).unwrap_or(i64::MAX);
        let idle_timeout = chrono::Duration::seconds(secs.min(i64::MAX / 1_000));
        Arc::new_cyclic(|me| Self {
            repo,
            index,
            embedder,
            long_term,
            clock,
            deadline,
            idle_timeout,
            episodes: RwLock::new(HashMap::new()),
            active_by_session: SyncMutex::new(HashMap::new()),
            stranded: SyncMutex::new(HashMap::new()),
            session_locks: KeyedLocks::new(),
            timers: SyncMutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
            index_ready: OnceCell::new(),
            me: me.clone(),
        })
    }

    pub fn idle_timeout(&self) -> chrono::Duration {
        self.idle_timeout
    }

    fn active_map(&self) -> std::sync::MutexGuard<'_, HashMap<String, Uuid>> {
        self.active_by_session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn stranded_map(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, String>> {
        self.stranded.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn timer_map(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Timer>> {
        self.timers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Load the index snapshot before the first index read or write, so a
    /// write never replaces an unread snapshot.
    async fn ensure_index(&self) -> Result<(), DomainError> {
        self.index_ready
            .get_or_try_init(|| async {
                self.deadline.run("vector.load", || self.index.load()).await
            })
            .await
            .map(|_| ())
    }

    async fn save(&self, episode: &Episode) -> Result<(), DomainError> {
        self.deadline
            .run("episodes.save", || self.repo.save(episode))
            .await
    }

    /// In-memory handle for an episode, loading it from the repository on
    /// first use.
    async fn handle(&self, id: Uuid) -> Result<Arc<Mutex<Episode>>, DomainError> {
        if let Some(handle) = self.episodes.read().await.get(&id) {
            return Ok(handle.clone());
        }
        let episode = self
            .deadline
            .run("episodes.find_by_id", || self.repo.find_by_id(id))
            .await?
            .ok_or_else(|| DomainError::not_found("Episode", id))?;
        Ok(self
            .episodes
            .write()
            .await
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(episode)))
            .clone())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start an episode for the session. If the session already has an
    /// ACTIVE episode that one is returned unchanged; an active episode that
    /// has gone idle is auto-closed first.
    pub async fn start_episode(&self, params: StartEpisode) -> Result<Episode, DomainError> {
        if params.session_id.trim().is_empty() {
            return Err(DomainError::Validation("session_id is required".into()));
        }
        let _session = self.session_locks.lock(&params.session_id).await;

        // A second ACTIVE episode may not open while a displaced one remains
        if let (_, Some(e)) = self.close_stranded(Some(&params.session_id)).await {
            return Err(e);
        }

        let current = self.active_map().get(&params.session_id).copied();
        if let Some(id) = current {
            let handle = self.handle(id).await?;
            let mut episode = handle.lock().await;
            if episode.is_active() {
                if episode.is_idle(self.clock.now(), self.idle_timeout) {
                    self.close_locked(&mut episode, AUTO_CLOSED_OUTCOME).await?;
                } else {
                    return Ok(episode.clone());
                }
            }
        }

        let now = self.clock.now();
        let episode = Episode::start(
            params.session_id.clone(),
            params.episode_type,
            params.title,
            params.participants,
            params.context,
            now,
        );
        self.save(&episode).await?;

        let id = episode.id;
        self.episodes
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(episode.clone())));
        self.active_map().insert(params.session_id.clone(), id);
        self.arm_timer(id, episode.idle_deadline(self.idle_timeout));
        self.index_episode(&episode).await;

        tracing::info!(episode_id = %id, session_id = %params.session_id, episode_type = %episode.episode_type, "Episode started");
        Ok(episode)
    }

    /// Append an event. Fails with NotFound when the episode is unknown or
    /// closed, including when this call finds it idle and closes it.
    pub async fn append_event(&self, id: Uuid, event: NewEvent) -> Result<Event, DomainError> {
        event.validate()?;
        let handle = self.handle(id).await?;
        let mut episode = handle.lock().await;
        if !episode.is_active() {
            return Err(DomainError::not_found("Episode", id));
        }

        let now = self.clock.now();
        if episode.is_idle(now, self.idle_timeout) {
            self.close_locked(&mut episode, AUTO_CLOSED_OUTCOME).await?;
            return Err(DomainError::not_found("Episode", id));
        }

        let mut updated = episode.clone();
        updated.push_event(event, now)?;
        self.save(&updated).await?;
        *episode = updated;
        self.arm_timer(id, episode.idle_deadline(self.idle_timeout));

        let appended = episode
            .events
            .last()
            .cloned()
            .ok_or_else(|| DomainError::Repository("event log is empty".into()))?;
        tracing::debug!(episode_id = %id, event_type = %appended.event_type, "Event appended");
        Ok(appended)
    }

    /// Record one chat message in the session's active episode, starting a
    /// conversation episode when there is none.
    pub async fn record_message(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(Uuid, Event), DomainError> {
        let event = match role {
            "user" => NewEvent::user_message(content),
            "assistant" => NewEvent::assistant_response(content),
            other => {
                return Err(DomainError::Validation(format!(
                    "role must be 'user' or 'assistant', got '{}'",
                    other
                )))
            }
        };

        let episode = self
            .start_episode(StartEpisode::conversation(session_id))
            .await?;
        match self.append_event(episode.id, event.clone()).await {
            // Closed between start and append (idle sweep); open a fresh one
            Err(DomainError::NotFound { .. }) => {
                let episode = self
                    .start_episode(StartEpisode::conversation(session_id))
                    .await?;
                let appended = self.append_event(episode.id, event).await?;
                Ok((episode.id, appended))
            }
            other => other.map(|appended| (episode.id, appended)),
        }
    }

    /// Register a memory created during an active episode
    pub async fn link_memory(&self, id: Uuid, memory_id: &str) -> Result<Episode, DomainError> {
        let handle = self.handle(id).await?;
        let mut episode = handle.lock().await;
        if !episode.is_active() {
            return Err(DomainError::not_found("Episode", id));
        }
        let mut updated = episode.clone();
        updated.link_memory(memory_id);
        self.save(&updated).await?;
        *episode = updated;
        Ok(episode.clone())
    }

    /// Close an episode. Closing twice returns the stored result.
    pub async fn close_episode(&self, id: Uuid, outcome: &str) -> Result<EpisodeMetrics, DomainError> {
        let handle = self.handle(id).await?;
        let mut episode = handle.lock().await;
        self.close_locked(&mut episode, outcome).await
    }

    /// Close while holding the episode's lock. The stored episode only
    /// changes once the closed state is durable; on a failed save it stays
    /// ACTIVE.
    async fn close_locked(
        &self,
        episode: &mut Episode,
        outcome: &str,
    ) -> Result<EpisodeMetrics, DomainError> {
        if let Some(metrics) = &episode.metrics {
            self.stranded_map().remove(&episode.id);
            return Ok(metrics.clone());
        }

        let mut closed = episode.clone();
        let metrics = closed.close(outcome, self.clock.now());
        self.save(&closed).await?;
        *episode = closed;
        self.stranded_map().remove(&episode.id);

        self.cancel_timer(episode.id);
        {
            let mut active = self.active_map();
            if active.get(&episode.session_id) == Some(&episode.id) {
                active.remove(&episode.session_id);
            }
        }

        tracing::info!(
            episode_id = %episode.id,
            outcome = %metrics.outcome,
            duration_secs = metrics.duration_secs,
            events = metrics.event_count,
            "Episode closed"
        );

        self.index_episode(episode).await;
        self.consolidate_summary(episode).await;
        Ok(metrics)
    }

    /// Push the closed episode's summary into the long-term store and link
    /// it. Failures are logged; the close itself already succeeded.
    async fn consolidate_summary(&self, episode: &mut Episode) {
        let Some(long_term) = &self.long_term else {
            return;
        };
        let summary = episode
            .summary
            .clone()
            .unwrap_or_else(|| episode.generate_summary());
        let mut item = MemoryItem::new(summary, self.clock.now())
            .with_session(episode.session_id.clone())
            .with_tags(vec!["episode".to_string(), episode.episode_type.to_string()])
            .with_source(MemorySource::Episode);
        item.id = summary_memory_id(episode.id);

        match long_term.consolidate(&item, None).await {
            Ok((_, stored)) => {
                let mut linked = episode.clone();
                linked.link_memory(stored.id);
                match self.save(&linked).await {
                    Ok(()) => *episode = linked,
                    Err(e) => {
                        tracing::warn!(episode_id = %episode.id, error = %e, "Failed to link episode summary memory")
                    }
                }
            }
            Err(e) => {
                tracing::warn!(episode_id = %episode.id, error = %e, "Episode summary not consolidated")
            }
        }
    }

    /// Outcome and success-metric backfill; allowed after close
    pub async fn backfill(
        &self,
        id: Uuid,
        outcome: Option<String>,
        success_metrics: HashMap<String, f32>,
    ) -> Result<Episode, DomainError> {
        if let Some((name, _)) = success_metrics.iter().find(|(_, v)| !v.is_finite()) {
            return Err(DomainError::Validation(format!(
                "success metric '{}' must be a finite number",
                name
            )));
        }
        let handle = self.handle(id).await?;
        let mut episode = handle.lock().await;
        let mut updated = episode.clone();
        updated.backfill(outcome, success_metrics);
        self.save(&updated).await?;
        *episode = updated;
        Ok(episode.clone())
    }

    // ------------------------------------------------------------------
    // Idle timeout
    // ------------------------------------------------------------------

    fn arm_timer(&self, id: Uuid, deadline_at: DateTime<Utc>) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let wait = (deadline_at - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let me = self.me.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            if let Some(service) = me.upgrade() {
                service.expire(id, generation).await;
            }
        });

        if let Some(previous) = self.timer_map().insert(id, Timer { generation, handle }) {
            previous.handle.abort();
        }
    }

    fn cancel_timer(&self, id: Uuid) {
        if let Some(timer) = self.timer_map().remove(&id) {
            timer.handle.abort();
        }
    }

    /// Timer callback. A stale generation means the timer was re-armed.
    async fn expire(&self, id: Uuid, generation: u64) {
        let Ok(handle) = self.handle(id).await else {
            return;
        };
        let mut episode = handle.lock().await;
        {
            let mut timers = self.timer_map();
            match timers.get(&id) {
                Some(timer) if timer.generation == generation => {
                    // Detach without aborting: this task is the timer
                    timers.remove(&id);
                }
                _ => return,
            }
        }

        if !episode.is_active() {
            return;
        }
        if episode.is_idle(self.clock.now(), self.idle_timeout) {
            if let Err(e) = self.close_locked(&mut episode, AUTO_CLOSED_OUTCOME).await {
                tracing::warn!(episode_id = %id, error = %e, "Auto-close failed; episode stays active");
            }
        } else {
            self.arm_timer(id, episode.idle_deadline(self.idle_timeout));
        }
    }

    /// Retry closing displaced episodes, optionally for one session only.
    /// Returns what closed and the last failure.
    async fn close_stranded(
        &self,
        session_id: Option<&str>,
    ) -> (Vec<EpisodeMetrics>, Option<DomainError>) {
        let ids: Vec<Uuid> = self
            .stranded_map()
            .iter()
            .filter(|(_, session)| session_id.map_or(true, |s| s == session.as_str()))
            .map(|(id, _)| *id)
            .collect();
        let mut closed = Vec::new();
        let mut failure = None;
        for id in ids {
            let handle = match self.handle(id).await {
                Ok(handle) => handle,
                Err(e) => {
                    failure = Some(e);
                    continue;
                }
            };
            let mut episode = handle.lock().await;
            if !episode.is_active() {
                self.stranded_map().remove(&id);
                continue;
            }
            match self.close_locked(&mut episode, AUTO_CLOSED_OUTCOME).await {
                Ok(metrics) => closed.push(metrics),
                Err(e) => {
                    tracing::warn!(episode_id = %id, error = %e, "Displaced episode still active");
                    failure = Some(e);
                }
            }
        }
        (closed, failure)
    }

    /// Close every ACTIVE episode idle at the current time, plus any
    /// displaced on load. Episodes whose close fails stay ACTIVE and are
    /// retried on the next sweep.
    pub async fn sweep_idle(&self) -> Vec<EpisodeMetrics> {
        let (mut closed, _) = self.close_stranded(None).await;
        let ids: Vec<Uuid> = self.active_map().values().copied().collect();
        for id in ids {
            let handle = match self.handle(id).await {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::warn!(episode_id = %id, error = %e, "Sweep skipped episode");
                    continue;
                }
            };
            let mut episode = handle.lock().await;
            if !episode.is_idle(self.clock.now(), self.idle_timeout) {
                continue;
            }
            match self.close_locked(&mut episode, AUTO_CLOSED_OUTCOME).await {
                Ok(metrics) => closed.push(metrics),
                Err(e) => {
                    tracing::warn!(episode_id = %id, error = %e, "Auto-close failed; episode stays active")
                }
            }
        }
        if !closed.is_empty() {
            tracing::info!(count = closed.len(), "Idle sweep closed episodes");
        }
        closed
    }

    /// Abort every pending idle timer
    pub fn shutdown(&self) {
        for (_, timer) in self.timer_map().drain() {
            timer.handle.abort();
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub async fn get(&self, id: Uuid) -> Result<Option<Episode>, DomainError> {
        match self.handle(id).await {
            Ok(handle) => Ok(Some(handle.lock().await.clone())),
            Err(DomainError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn list_active(&self) -> Result<Vec<Episode>, DomainError> {
        let ids: Vec<Uuid> = self.active_map().values().copied().collect();
        let mut active = Vec::with_capacity(ids.len());
        for id in ids {
            let episode = self.handle(id).await?.lock().await.clone();
            if episode.is_active() {
                active.push(episode);
            }
        }
        active.sort_by(|a, b| b.last_event_at.cmp(&a.last_event_at));
        Ok(active)
    }

    /// The session's ACTIVE episode, if any
    pub async fn active_for_session(&self, session_id: &str) -> Result<Option<Episode>, DomainError> {
        let current = self.active_map().get(session_id).copied();
        match current {
            Some(id) => self.get(id).await,
            None => Ok(None),
        }
    }

    pub async fn session_episodes(&self, session_id: &str) -> Result<Vec<Episode>, DomainError> {
        self.deadline
            .run("episodes.find_by_session", || self.repo.find_by_session(session_id))
            .await
    }

    pub async fn conversation_history(&self, id: Uuid) -> Result<Vec<ConversationTurn>, DomainError> {
        let handle = self.handle(id).await?;
        let episode = handle.lock().await;
        Ok(episode.conversation_history())
    }

    /// Keyword score blended with similarity over title+summary embeddings.
    /// When the embedding path fails the ranking is keyword-only and the
    /// result says so.
    pub async fn search(&self, query: &str, limit: usize) -> Result<EpisodeSearch, DomainError> {
        let episodes = self
            .deadline
            .run("episodes.find_all", || self.repo.find_all())
            .await?;

        let (mode, degraded_reason, semantic) = match self.semantic_scores(query, episodes.len()).await {
            Ok(scores) => (SearchMode::Hybrid, None, Some(scores)),
            Err(e) => {
                tracing::warn!(error = %e, "Episode search degraded to keyword matching");
                (SearchMode::Keyword, Some(e.to_string()), None)
            }
        };

        let mut hits: Vec<EpisodeHit> = episodes
            .into_iter()
            .filter_map(|episode| {
                let keyword_score = episode_keyword_score(&episode, query);
                let semantic_score = semantic
                    .as_ref()
                    .map(|s| s.get(&episode.id.to_string()).copied().unwrap_or(0.0).max(0.0));
                let score = match semantic_score {
                    Some(sem) => 0.5 * keyword_score + 0.5 * sem,
                    None => keyword_score,
                };
                (score > 0.0).then_some(EpisodeHit {
                    episode,
                    score,
                    keyword_score,
                    semantic_score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            cmp_score_desc(a.score, b.score)
                .then_with(|| b.episode.last_event_at.cmp(&a.episode.last_event_at))
        });
        hits.truncate(limit);

        Ok(EpisodeSearch {
            mode,
            degraded_reason,
            hits,
        })
    }

    async fn semantic_scores(&self, query: &str, k: usize) -> Result<HashMap<String, f32>, DomainError> {
        self.ensure_index().await?;
        let embedding = self
            .deadline
            .run("embedding", || self.embedder.embed(query))
            .await?;
        let hits = self
            .deadline
            .run("vector.search", || self.index.search(&embedding, k))
            .await?;
        Ok(hits.into_iter().map(|h| (h.id, h.score)).collect())
    }

    /// (Re)index the episode's title+summary text. Failures are logged.
    async fn index_episode(&self, episode: &Episode) {
        let text = episode.embedding_text();
        let result: Result<(), DomainError> = async {
            self.ensure_index().await?;
            let embedding = self
                .deadline
                .run("embedding", || self.embedder.embed(&text))
                .await?;
            let id = episode.id.to_string();
            self.deadline
                .run("vector.add", || self.index.add(&id, embedding.clone()))
                .await?;
            self.deadline
                .run("vector.persist", || self.index.persist())
                .await
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(episode_id = %episode.id, error = %e, "Episode not indexed for semantic search");
        }
    }

    // ------------------------------------------------------------------
    // Startup
    // ------------------------------------------------------------------

    /// Reload persisted episodes, resolve duplicate or idle ACTIVE episodes,
    /// re-arm timers and verify the episode index.
    pub async fn load(&self) -> Result<ConsistencyReport, DomainError> {
        self.shutdown();
        let episodes = self
            .deadline
            .run("episodes.find_all", || self.repo.find_all())
            .await?;

        // Verify the index first: closing stale episodes below writes to it.
        let records: Vec<(String, Vec<f32>)> = episodes
            .iter()
            .map(|e| (e.id.to_string(), Vec::new()))
            .collect();
        let report = reconcile("episodes", self.index.as_ref(), &self.deadline, records).await?;
        let _ = self.index_ready.set(());

        let mut active_by_session: HashMap<String, Vec<Uuid>> = HashMap::new();
        {
            let mut map = self.episodes.write().await;
            map.clear();
            for episode in episodes {
                if episode.is_active() {
                    active_by_session
                        .entry(episode.session_id.clone())
                        .or_default()
                        .push(episode.id);
                }
                map.insert(episode.id, Arc::new(Mutex::new(episode)));
            }
        }
        self.active_map().clear();
        self.stranded_map().clear();

        let now = self.clock.now();
        for (session_id, ids) in active_by_session {
            // Newest ACTIVE episode wins; older ones are auto-closed
            let mut candidates = Vec::with_capacity(ids.len());
            for id in ids {
                candidates.push(self.handle(id).await?);
            }
            let mut started = Vec::with_capacity(candidates.len());
            for handle in &candidates {
                started.push(handle.lock().await.start_time);
            }
            let newest = started
                .iter()
                .enumerate()
                .max_by_key(|(_, t)| **t)
                .map(|(i, _)| i);

            for (i, handle) in candidates.iter().enumerate() {
                let mut episode = handle.lock().await;
                if Some(i) == newest && !episode.is_idle(now, self.idle_timeout) {
                    self.active_map().insert(session_id.clone(), episode.id);
                    self.arm_timer(episode.id, episode.idle_deadline(self.idle_timeout));
                } else if let Err(e) = self.close_locked(&mut episode, AUTO_CLOSED_OUTCOME).await {
                    tracing::warn!(episode_id = %episode.id, error = %e, "Could not close stale episode on load");
                    if Some(i) == newest {
                        // Idle but still the session's episode; the timer and sweep retry
                        self.active_map().insert(session_id.clone(), episode.id);
                        self.arm_timer(episode.id, episode.idle_deadline(self.idle_timeout));
                    } else {
                        self.stranded_map().insert(episode.id, session_id.clone());
                    }
                }
            }
        }

        Ok(report)
    }
}

/// Long-term memory id of an episode's summary; stable so a retried close
/// consolidates into the same record.
pub fn summary_memory_id(episode_id: Uuid) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("episode:{}", episode_id).as_bytes()).to_string()
}
