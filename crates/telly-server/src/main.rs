use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use telly::{EmbeddingService, SystemClock};
use telly_server::adapters::{HashingEmbedding, OpenAiEmbedding};
use telly_server::config::AppConfig;
use telly_server::services::sweeper;
use telly_server::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🧠 Telly memory initializing...");

    let config = AppConfig::from_env()?;

    if config.api_key.is_some() {
        tracing::info!("🔐 API key authentication enabled");
    } else {
        tracing::warn!("⚠️  No TELLY_API_KEY set - authentication disabled");
    }
    if !config.memory_enabled {
        tracing::warn!("⚠️  MEMORY_ENABLED=false - memory capture and context disabled");
    }

    let embedder: Arc<dyn EmbeddingService> = match &config.openai_api_key {
        Some(key) => {
            tracing::info!("🧬 Embedding service initialized (OpenAI)");
            Arc::new(OpenAiEmbedding::new(key.clone(), config.embedding_dimension))
        }
        None => {
            tracing::warn!("⚠️  No OPENAI_API_KEY set - using local hashing embeddings");
            Arc::new(HashingEmbedding::new(config.embedding_dimension))
        }
    };

    let bind_addr = config.bind_addr.clone();
    let sweep_interval = config.sweep_interval;

    let state = AppState::build(config, embedder, Arc::new(SystemClock))
        .await
        .context("Failed to initialize memory stores")?;
    tracing::info!("✅ Stores loaded and verified");

    let episodes = state.episodes.clone();
    let _sweeper =
        sweeper::maybe_start_sweeper(episodes.clone(), state.sessions.clone(), sweep_interval);

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!("📚 Swagger UI: /swagger-ui");
    tracing::info!("✅ Telly ready on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("⚠️  Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("👋 Shutting down");
            episodes.shutdown();
        })
        .await
        .context("Server error")?;

    Ok(())
}
