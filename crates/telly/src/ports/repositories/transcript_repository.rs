//! Transcript Repository Port
//!
//! Abstract interface for TranscriptRecord persistence operations.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{errors::DomainError, TranscriptRecord};

/// Repository interface for TranscriptRecord entities
#[async_trait]
pub trait TranscriptRepository: Send + Sync {
    /// Insert or replace by id; url is unique across records
    async fn save(&self, record: &TranscriptRecord) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TranscriptRecord>, DomainError>;

    async fn find_by_url(&self, url: &str) -> Result<Option<TranscriptRecord>, DomainError>;

    async fn find_all(&self) -> Result<Vec<TranscriptRecord>, DomainError>;

    /// Most recently saved first
    async fn find_recent(&self, limit: usize) -> Result<Vec<TranscriptRecord>, DomainError>;
}
