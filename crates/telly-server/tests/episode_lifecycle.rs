mod common;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;

use telly::domain::AUTO_CLOSED_OUTCOME;
use telly::{DomainError, EmbeddingService, EpisodeStatus, EventType, NewEvent, SearchMode, SystemClock};
use telly_server::adapters::HashingEmbedding;
use telly_server::application::{summary_memory_id, StartEpisode};
use telly_server::AppState;

use common::{build_state, harness, harness_with, t0, test_config, DIMENSION};

#[tokio::test]
async fn test_start_is_idempotent_per_session() {
    let h = harness().await;
    let first = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();
    assert_eq!(first.status, EpisodeStatus::Active);
    assert_eq!(first.events.len(), 1);
    assert_eq!(first.events[0].event_type, EventType::EpisodeStart);

    let again = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();
    assert_eq!(again.id, first.id);

    let other = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s2"))
        .await
        .unwrap();
    assert_ne!(other.id, first.id);
    assert_eq!(h.state.episodes.list_active().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_close_computes_metrics_and_is_idempotent() {
    let h = harness().await;
    let episode = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();

    h.clock.advance(Duration::seconds(30));
    h.state
        .episodes
        .append_event(episode.id, NewEvent::user_message("hi").with_impact(0.2))
        .await
        .unwrap();
    h.clock.advance(Duration::seconds(30));
    h.state
        .episodes
        .append_event(episode.id, NewEvent::assistant_response("hello").with_impact(0.8))
        .await
        .unwrap();

    let metrics = h
        .state
        .episodes
        .close_episode(episode.id, "resolved")
        .await
        .unwrap();
    assert_eq!(metrics.outcome, "resolved");
    assert_eq!(metrics.duration_secs, 60);
    assert_eq!(metrics.user_messages, 1);
    assert_eq!(metrics.assistant_messages, 1);
    assert!((metrics.mean_impact - 0.5).abs() < 1e-6);

    h.clock.advance(Duration::seconds(30));
    let again = h
        .state
        .episodes
        .close_episode(episode.id, "different")
        .await
        .unwrap();
    assert_eq!(again, metrics);

    let stored = h.state.episodes.get(episode.id).await.unwrap().unwrap();
    assert_eq!(stored.status, EpisodeStatus::Closed);
    assert_eq!(stored.events.last().unwrap().event_type, EventType::EpisodeEnd);
    assert!(h.state.episodes.list_active().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_append_after_close_is_not_found() {
    let h = harness().await;
    let episode = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();
    h.state
        .episodes
        .close_episode(episode.id, "done")
        .await
        .unwrap();

    let err = h
        .state
        .episodes
        .append_event(episode.id, NewEvent::user_message("late"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));

    let missing = h
        .state
        .episodes
        .append_event(uuid::Uuid::new_v4(), NewEvent::user_message("who"))
        .await
        .unwrap_err();
    assert!(matches!(missing, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_invalid_events_are_rejected() {
    let h = harness().await;
    let episode = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();

    let err = h
        .state
        .episodes
        .append_event(episode.id, NewEvent::user_message("x").with_impact(1.5))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = h
        .state
        .episodes
        .append_event(episode.id, NewEvent::new(EventType::EpisodeEnd, "user", "forged"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_idle_sweep_boundary() {
    let h = harness().await;
    let episode = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();

    h.clock.set(t0() + Duration::seconds(7199));
    assert!(h.state.episodes.sweep_idle().await.is_empty());
    let still = h.state.episodes.get(episode.id).await.unwrap().unwrap();
    assert_eq!(still.status, EpisodeStatus::Active);

    h.clock.set(t0() + Duration::seconds(7200));
    let closed = h.state.episodes.sweep_idle().await;
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].outcome, AUTO_CLOSED_OUTCOME);

    let stored = h.state.episodes.get(episode.id).await.unwrap().unwrap();
    assert_eq!(stored.status, EpisodeStatus::Closed);
    assert_eq!(stored.outcome.as_deref(), Some(AUTO_CLOSED_OUTCOME));
}

#[tokio::test]
async fn test_events_push_the_idle_deadline() {
    let h = harness().await;
    let episode = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();

    h.clock.set(t0() + Duration::seconds(7000));
    h.state
        .episodes
        .append_event(episode.id, NewEvent::user_message("still here"))
        .await
        .unwrap();

    h.clock.set(t0() + Duration::seconds(7200));
    assert!(h.state.episodes.sweep_idle().await.is_empty());

    h.clock.set(t0() + Duration::seconds(14_200));
    assert_eq!(h.state.episodes.sweep_idle().await.len(), 1);
}

#[tokio::test]
async fn test_lazy_idle_check_on_append() {
    let h = harness().await;
    let episode = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();

    h.clock.advance(Duration::seconds(7200));
    let err = h
        .state
        .episodes
        .append_event(episode.id, NewEvent::user_message("too late"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));

    let stored = h.state.episodes.get(episode.id).await.unwrap().unwrap();
    assert_eq!(stored.outcome.as_deref(), Some(AUTO_CLOSED_OUTCOME));
}

#[tokio::test]
async fn test_start_replaces_idle_active_episode() {
    let h = harness().await;
    let stale = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();

    h.clock.advance(Duration::hours(3));
    let fresh = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();
    assert_ne!(fresh.id, stale.id);

    let stale = h.state.episodes.get(stale.id).await.unwrap().unwrap();
    assert_eq!(stale.status, EpisodeStatus::Closed);
}

#[tokio::test]
async fn test_record_message_builds_history() {
    let h = harness().await;
    let (first_id, _) = h
        .state
        .episodes
        .record_message("s1", "user", "what is a monad?")
        .await
        .unwrap();
    let (second_id, event) = h
        .state
        .episodes
        .record_message("s1", "assistant", "a monoid in the category of endofunctors")
        .await
        .unwrap();
    assert_eq!(first_id, second_id);
    assert_eq!(event.event_type, EventType::AssistantResponse);

    let history = h.state.episodes.conversation_history(first_id).await.unwrap();
    let roles: Vec<&str> = history.iter().map(|t| t.role.as_str()).collect();
    assert_eq!(roles, vec!["user", "assistant"]);
    assert_eq!(history[0].content, "what is a monad?");

    let err = h
        .state
        .episodes
        .record_message("s1", "narrator", "meanwhile")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_event_timestamps_never_go_backwards() {
    let h = harness().await;
    let episode = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();
    h.clock.advance(Duration::seconds(10));
    h.state
        .episodes
        .append_event(episode.id, NewEvent::user_message("one"))
        .await
        .unwrap();
    h.clock.advance(Duration::seconds(-5));
    let event = h
        .state
        .episodes
        .append_event(episode.id, NewEvent::user_message("two"))
        .await
        .unwrap();
    assert_eq!(event.timestamp, t0() + Duration::seconds(10));

    let stored = h.state.episodes.get(episode.id).await.unwrap().unwrap();
    assert!(stored
        .events
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn test_close_consolidates_summary_into_long_term() {
    let h = harness().await;
    let (episode_id, _) = h
        .state
        .episodes
        .record_message("s1", "user", "plan the garden layout")
        .await
        .unwrap();
    h.state
        .episodes
        .close_episode(episode_id, "planned")
        .await
        .unwrap();

    let memory_id = summary_memory_id(episode_id);
    let summary = h.state.long_term.get(&memory_id).await.unwrap().unwrap();
    assert!(summary.tags.contains(&"episode".to_string()));

    let episode = h.state.episodes.get(episode_id).await.unwrap().unwrap();
    assert!(episode.memories_created.contains(&memory_id));
}

#[tokio::test]
async fn test_memory_disabled_skips_summary_consolidation() {
    let h = harness_with(|c| c.memory_enabled = false).await;
    let (episode_id, _) = h
        .state
        .episodes
        .record_message("s1", "user", "nothing to remember")
        .await
        .unwrap();
    h.state
        .episodes
        .close_episode(episode_id, "done")
        .await
        .unwrap();
    assert_eq!(h.state.long_term.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_backfill_after_close() {
    let h = harness().await;
    let episode = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();
    h.state
        .episodes
        .close_episode(episode.id, "pending")
        .await
        .unwrap();

    let mut metrics = HashMap::new();
    metrics.insert("satisfaction".to_string(), 0.9);
    let updated = h
        .state
        .episodes
        .backfill(episode.id, Some("success".to_string()), metrics)
        .await
        .unwrap();
    assert_eq!(updated.outcome.as_deref(), Some("success"));
    assert_eq!(updated.success_metrics.get("satisfaction"), Some(&0.9));

    let mut bad = HashMap::new();
    bad.insert("nan".to_string(), f32::NAN);
    let err = h.state.episodes.backfill(episode.id, None, bad).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_link_memory_requires_active_episode() {
    let h = harness().await;
    let episode = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();
    let linked = h.state.episodes.link_memory(episode.id, "m-1").await.unwrap();
    assert_eq!(linked.memories_created, vec!["m-1".to_string()]);

    h.state
        .episodes
        .close_episode(episode.id, "done")
        .await
        .unwrap();
    let err = h
        .state
        .episodes
        .link_memory(episode.id, "m-2")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_search_is_hybrid_then_keyword_when_degraded() {
    let h = harness().await;
    for (session, title) in [("s1", "Garden planning"), ("s2", "Tax return questions")] {
        let mut params = StartEpisode::conversation(session);
        params.title = title.to_string();
        h.state.episodes.start_episode(params).await.unwrap();
    }

    let results = h.state.episodes.search("garden", 10).await.unwrap();
    assert_eq!(results.mode, SearchMode::Hybrid);
    assert!(results.degraded_reason.is_none());
    assert_eq!(results.hits[0].episode.title, "Garden planning");

    h.embedder.set_available(false);
    let degraded = h.state.episodes.search("garden", 10).await.unwrap();
    assert_eq!(degraded.mode, SearchMode::Keyword);
    assert!(degraded.degraded_reason.is_some());
    assert_eq!(degraded.hits.len(), 1);
    assert_eq!(degraded.hits[0].episode.title, "Garden planning");
}

#[tokio::test]
async fn test_active_episode_survives_restart() {
    let h = harness().await;
    let episode = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();
    h.state.episodes.shutdown();

    let restarted = build_state(&h.config, &h.embedder, &h.clock).await;
    let active = restarted
        .episodes
        .active_for_session("s1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.id, episode.id);
    assert_eq!(restarted.episodes.session_episodes("s1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_restart_closes_episodes_that_went_idle() {
    let h = harness().await;
    let episode = h
        .state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();
    h.state.episodes.shutdown();

    h.clock.advance(Duration::hours(2));
    let restarted = build_state(&h.config, &h.embedder, &h.clock).await;
    assert!(restarted
        .episodes
        .active_for_session("s1")
        .await
        .unwrap()
        .is_none());
    let stored = restarted.episodes.get(episode.id).await.unwrap().unwrap();
    assert_eq!(stored.outcome.as_deref(), Some(AUTO_CLOSED_OUTCOME));
}

#[tokio::test]
async fn test_idle_timer_closes_episode_without_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    config.idle_timeout = std::time::Duration::from_secs(1);
    let embedder: Arc<dyn EmbeddingService> = Arc::new(HashingEmbedding::new(DIMENSION));
    let state = AppState::build(config, embedder, Arc::new(SystemClock))
        .await
        .unwrap();

    let episode = state
        .episodes
        .start_episode(StartEpisode::conversation("s1"))
        .await
        .unwrap();

    // The event re-arms the timer, so the first deadline passes harmlessly
    tokio::time::sleep(std::time::Duration::from_millis(600)).await;
    state
        .episodes
        .append_event(episode.id, NewEvent::user_message("still typing"))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(700)).await;
    let open = state.episodes.get(episode.id).await.unwrap().unwrap();
    assert_eq!(open.status, EpisodeStatus::Active);

    tokio::time::sleep(std::time::Duration::from_millis(1000)).await;
    let closed = state.episodes.get(episode.id).await.unwrap().unwrap();
    assert_eq!(closed.status, EpisodeStatus::Closed);
    assert_eq!(closed.outcome.as_deref(), Some(AUTO_CLOSED_OUTCOME));
    assert!(state.episodes.active_for_session("s1").await.unwrap().is_none());
    state.episodes.shutdown();
}
