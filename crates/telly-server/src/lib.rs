//! Telly Memory Server
//!
//! Infrastructure adapters, memory use cases and the HTTP surface.

pub mod adapters;
pub mod application;
pub mod auth;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use telly::{Clock, DomainError, EmbeddingService};

use adapters::{
    build_index, sqlite, SqliteEpisodeRepository, SqliteMemoryRepository,
    SqliteTranscriptRepository,
};
use application::{
    ContextService, Deadline, EpisodeService, LongTermService, SessionContext,
    SessionMemoryService, TranscriptService,
};
use config::AppConfig;

/// Type aliases for application services with concrete repository implementations
pub type AppLongTermService = LongTermService<SqliteMemoryRepository>;
pub type AppSessionService = SessionMemoryService<SqliteMemoryRepository>;
pub type AppEpisodeService = EpisodeService<SqliteEpisodeRepository, SqliteMemoryRepository>;
pub type AppTranscriptService = TranscriptService<SqliteTranscriptRepository>;
pub type AppContextService = ContextService<SqliteMemoryRepository, SqliteEpisodeRepository>;

/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub long_term: Arc<AppLongTermService>,
    pub sessions: Arc<AppSessionService>,
    pub episodes: Arc<AppEpisodeService>,
    pub transcripts: Arc<AppTranscriptService>,
    pub context: Arc<AppContextService>,
}

impl AppState {
    /// Open storage, build every store and verify the indexes against their
    /// records before anything is served.
    pub async fn build(
        config: AppConfig,
        embedder: Arc<dyn EmbeddingService>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DomainError> {
        if embedder.dimension() != config.embedding_dimension {
            return Err(DomainError::DimensionMismatch {
                expected: config.embedding_dimension,
                actual: embedder.dimension(),
            });
        }

        let pool = sqlite::connect(&config.database_url).await?;
        let deadline = Deadline::new(config.backend_timeout);

        let long_term = Arc::new(LongTermService::new(
            Arc::new(SqliteMemoryRepository::new(pool.clone())),
            build_index(&config, "long_term").await?,
            embedder.clone(),
            clock.clone(),
            deadline,
        ));
        let sessions = Arc::new(SessionMemoryService::new(
            config.short_term_capacity,
            config.consolidation_threshold,
            long_term.clone(),
            clock.clone(),
        ));
        let episodes = EpisodeService::new(
            Arc::new(SqliteEpisodeRepository::new(pool.clone())),
            build_index(&config, "episodes").await?,
            embedder.clone(),
            config.memory_enabled.then(|| long_term.clone()),
            clock.clone(),
            deadline,
            config.idle_timeout,
        );
        let transcripts = Arc::new(TranscriptService::new(
            Arc::new(SqliteTranscriptRepository::new(pool)),
            build_index(&config, "transcripts").await?,
            embedder,
            clock,
            deadline,
        ));
        let context = Arc::new(ContextService::new(
            sessions.clone(),
            long_term.clone(),
            episodes.clone(),
            config.context.clone(),
        ));

        long_term.load().await?;
        transcripts.load().await?;
        episodes.load().await?;

        Ok(Self {
            config: Arc::new(config),
            long_term,
            sessions,
            episodes,
            transcripts,
            context,
        })
    }

    /// Request-scoped session view carrying the configured memory toggle
    pub fn session(&self, session_id: impl Into<String>) -> SessionContext {
        SessionContext::new(session_id, self.config.memory_enabled)
    }
}

#[derive(Serialize, ToSchema)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
    pub version: String,
    pub memory_enabled: bool,
}

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Server is up", body = HealthCheck)),
    tag = "Health"
)]
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<HealthCheck> {
    Json(HealthCheck {
        status: "ok".to_string(),
        message: "Telly memory is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        memory_enabled: state.config.memory_enabled,
    })
}

/// Full HTTP router: protected memory routes, health and Swagger UI
pub fn router(state: AppState) -> Router {
    let api_key = auth::ApiKey::new(state.config.api_key.clone());

    let protected_routes = Router::new()
        .merge(routes::memory::router())
        .merge(routes::session::router())
        .merge(routes::episode::router())
        .merge(routes::transcript::router())
        .layer(middleware::from_fn_with_state(api_key, auth::auth_middleware));

    let openapi = routes::swagger::ApiDoc::openapi();

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .route("/health", get(health_check))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
