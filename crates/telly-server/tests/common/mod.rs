//! Shared fixtures: a fully wired AppState over a temporary SQLite file,
//! in-process indexes, the hashing embedder and a manual clock.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use telly::{Clock, EmbeddingService, ManualClock};
use telly_server::adapters::HashingEmbedding;
use telly_server::config::AppConfig;
use telly_server::AppState;

pub const DIMENSION: usize = 64;

pub struct Harness {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub embedder: Arc<HashingEmbedding>,
    pub config: AppConfig,
    pub dir: TempDir,
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
}

pub fn test_config(dir: &TempDir) -> AppConfig {
    let data_dir = dir.path().to_string_lossy().to_string();
    AppConfig {
        database_url: format!("sqlite://{}/telly.db", data_dir),
        data_dir,
        short_term_capacity: 3,
        consolidation_threshold: 3,
        idle_timeout: Duration::from_secs(7200),
        sweep_interval: Duration::ZERO,
        embedding_dimension: DIMENSION,
        backend_timeout: Duration::from_secs(2),
        ..AppConfig::default()
    }
}

pub async fn harness() -> Harness {
    harness_with(|_| {}).await
}

pub async fn harness_with(customize: impl FnOnce(&mut AppConfig)) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    customize(&mut config);
    let clock = Arc::new(ManualClock::new(t0()));
    let embedder = Arc::new(HashingEmbedding::new(DIMENSION));
    let state = build_state(&config, &embedder, &clock).await;
    Harness {
        state,
        clock,
        embedder,
        config,
        dir,
    }
}

/// Build another AppState over the same storage, as a restart would
pub async fn build_state(
    config: &AppConfig,
    embedder: &Arc<HashingEmbedding>,
    clock: &Arc<ManualClock>,
) -> AppState {
    let embedder: Arc<dyn EmbeddingService> = embedder.clone();
    let clock: Arc<dyn Clock> = clock.clone();
    AppState::build(config.clone(), embedder, clock).await.unwrap()
}
