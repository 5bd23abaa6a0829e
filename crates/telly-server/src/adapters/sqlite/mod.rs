//! SQLite Repository Implementations
//!
//! One table per entity type. Timestamps are stored as RFC 3339 text,
//! list and JSON fields as serialized JSON text.

mod episode_repository;
mod memory_repository;
mod transcript_repository;

pub use episode_repository::SqliteEpisodeRepository;
pub use memory_repository::SqliteMemoryRepository;
pub use transcript_repository::SqliteTranscriptRepository;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use telly::DomainError;

/// Open (creating if needed) the database and apply migrations
pub async fn connect(database_url: &str) -> Result<SqlitePool, DomainError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(repo_err)?
        .create_if_missing(true);

    // An in-memory database lives per connection; keep exactly one.
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(repo_err)?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .map_err(|e| DomainError::Repository(format!("migration failed: {}", e)))?;

    Ok(pool)
}

pub(crate) fn repo_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Repository(e.to_string())
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, DomainError> {
    serde_json::to_string(value).map_err(repo_err)
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, DomainError> {
    serde_json::from_str(text).map_err(repo_err)
}
