//! Vector Index Port
//!
//! Nearest-neighbour search over fixed-dimension embeddings. Backends (an
//! in-process index, an external vector service) implement this trait and
//! are chosen once at construction; callers only see `dyn VectorIndex`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{errors::DomainError, DistanceMetric};

/// A search hit: record id and similarity (higher is closer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredId {
    pub id: String,
    pub score: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Dimension fixed at construction
    fn dimension(&self) -> usize;

    /// Metric fixed at construction
    fn metric(&self) -> DistanceMetric;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    /// Insert or replace the vector stored under `id`
    async fn add(&self, id: &str, vector: Vec<f32>) -> Result<(), DomainError>;

    /// Returns true when a vector was removed
    async fn remove(&self, id: &str) -> Result<bool, DomainError>;

    /// Up to `k` nearest ids by descending similarity. Fewer stored vectors
    /// than `k` yields all of them.
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredId>, DomainError>;

    /// Every id currently indexed
    async fn ids(&self) -> Result<Vec<String>, DomainError>;

    async fn len(&self) -> Result<usize, DomainError>;

    /// Flush to durable storage
    async fn persist(&self) -> Result<(), DomainError>;

    /// Restore from durable storage, replacing in-memory state
    async fn load(&self) -> Result<(), DomainError>;
}
