//! Server configuration, read from the environment (after `.env`).

use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use telly::domain::services::DEFAULT_SHORT_TERM_CAPACITY;
use telly::DistanceMetric;

/// Which vector index adapter backs every store
#[derive(Debug, Clone, PartialEq)]
pub enum VectorBackend {
    InProcess,
    Qdrant {
        url: String,
        api_key: Option<String>,
    },
}

/// Per-turn context budget
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBudget {
    /// Short-term items included, most recent first
    pub short_term_items: usize,
    /// Long-term matches included
    pub long_term_items: usize,
    /// Total characters across all parts
    pub max_chars: usize,
    /// Cap on the active-episode excerpt
    pub episode_excerpt_chars: usize,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            short_term_items: 10,
            long_term_items: 5,
            max_chars: 4000,
            episode_excerpt_chars: 800,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub data_dir: String,
    pub bind_addr: String,
    pub api_key: Option<String>,
    pub memory_enabled: bool,
    pub short_term_capacity: usize,
    pub consolidation_threshold: u32,
    pub idle_timeout: Duration,
    /// Backstop idle sweep; zero disables it
    pub sweep_interval: Duration,
    pub embedding_dimension: usize,
    pub openai_api_key: Option<String>,
    pub vector_backend: VectorBackend,
    pub vector_metric: DistanceMetric,
    pub backend_timeout: Duration,
    pub context: ContextBudget,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/telly.db".to_string(),
            data_dir: "data".to_string(),
            bind_addr: "0.0.0.0:8000".to_string(),
            api_key: None,
            memory_enabled: true,
            short_term_capacity: DEFAULT_SHORT_TERM_CAPACITY,
            consolidation_threshold: 3,
            idle_timeout: Duration::from_secs(7200),
            sweep_interval: Duration::from_secs(300),
            embedding_dimension: 1536,
            openai_api_key: None,
            vector_backend: VectorBackend::InProcess,
            vector_metric: DistanceMetric::Cosine,
            backend_timeout: Duration::from_millis(5000),
            context: ContextBudget::default(),
        }
    }
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let data_dir = get("DATA_DIR").unwrap_or(defaults.data_dir);
        let database_url = get("DATABASE_URL")
            .unwrap_or_else(|| format!("sqlite://{}/telly.db", data_dir.trim_end_matches('/')));

        let vector_backend = match get("VECTOR_BACKEND").as_deref() {
            None | Some("in_process") | Some("in-process") | Some("memory") => VectorBackend::InProcess,
            Some("qdrant") => VectorBackend::Qdrant {
                url: get("QDRANT_URL")
                    .ok_or_else(|| anyhow!("VECTOR_BACKEND=qdrant requires QDRANT_URL"))?,
                api_key: get("QDRANT_API_KEY"),
            },
            Some(other) => return Err(anyhow!("Unknown VECTOR_BACKEND: {}", other)),
        };

        let vector_metric = match get("VECTOR_METRIC") {
            Some(value) => value.parse::<DistanceMetric>().map_err(|e| anyhow!(e))?,
            None => defaults.vector_metric,
        };

        let context = ContextBudget {
            short_term_items: parse_or(&get, "CONTEXT_SHORT_TERM_ITEMS", defaults.context.short_term_items)?,
            long_term_items: parse_or(&get, "CONTEXT_LONG_TERM_ITEMS", defaults.context.long_term_items)?,
            max_chars: parse_or(&get, "CONTEXT_MAX_CHARS", defaults.context.max_chars)?,
            episode_excerpt_chars: parse_or(
                &get,
                "CONTEXT_EPISODE_EXCERPT_CHARS",
                defaults.context.episode_excerpt_chars,
            )?,
        };

        let config = Self {
            database_url,
            data_dir,
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            api_key: get("TELLY_API_KEY"),
            memory_enabled: parse_bool_or(&get, "MEMORY_ENABLED", defaults.memory_enabled)?,
            short_term_capacity: parse_or(&get, "MEMORY_SHORT_TERM_CAPACITY", defaults.short_term_capacity)?,
            consolidation_threshold: parse_or(
                &get,
                "MEMORY_CONSOLIDATION_THRESHOLD",
                defaults.consolidation_threshold,
            )?,
            idle_timeout: Duration::from_secs(parse_or(
                &get,
                "EPISODE_IDLE_TIMEOUT_SECS",
                defaults.idle_timeout.as_secs(),
            )?),
            sweep_interval: Duration::from_secs(parse_or(
                &get,
                "EPISODE_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval.as_secs(),
            )?),
            embedding_dimension: parse_or(&get, "EMBEDDING_DIMENSION", defaults.embedding_dimension)?,
            openai_api_key: get("OPENAI_API_KEY"),
            vector_backend,
            vector_metric,
            backend_timeout: Duration::from_millis(parse_or(
                &get,
                "BACKEND_TIMEOUT_MS",
                defaults.backend_timeout.as_millis() as u64,
            )?),
            context,
        };

        if config.embedding_dimension == 0 {
            return Err(anyhow!("EMBEDDING_DIMENSION must be positive"));
        }
        if config.consolidation_threshold == 0 {
            return Err(anyhow!("MEMORY_CONSOLIDATION_THRESHOLD must be at least 1"));
        }
        Ok(config)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .parse()
            .with_context(|| format!("Invalid value for {}: {}", key, value)),
        None => Ok(default),
    }
}

fn parse_bool_or<G>(get: &G, key: &str, default: bool) -> Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(anyhow!("Invalid value for {}: {}", key, v)),
    }
}
