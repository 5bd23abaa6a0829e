//! Episode Repository Port
//!
//! Abstract interface for Episode persistence operations.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{errors::DomainError, Episode};

/// Repository interface for Episode entities
#[async_trait]
pub trait EpisodeRepository: Send + Sync {
    /// Insert or replace the full episode, event log included
    async fn save(&self, episode: &Episode) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Episode>, DomainError>;

    async fn find_all(&self) -> Result<Vec<Episode>, DomainError>;

    /// Episodes of one session ordered by start time
    async fn find_by_session(&self, session_id: &str) -> Result<Vec<Episode>, DomainError>;
}
