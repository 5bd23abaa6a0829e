//! In-process vector index with an exact similarity scan.
//!
//! Snapshots are JSON files written to a temporary sibling and renamed into
//! place, so a crash mid-write leaves the previous snapshot intact.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use telly::domain::services::{cmp_score_desc, similarity};
use telly::{DistanceMetric, DomainError, ScoredId, VectorIndex};

#[derive(Serialize, Deserialize)]
struct Snapshot {
    dimension: usize,
    metric: DistanceMetric,
    vectors: HashMap<String, Vec<f32>>,
}

pub struct InProcessVectorIndex {
    dimension: usize,
    metric: DistanceMetric,
    path: Option<PathBuf>,
    vectors: RwLock<HashMap<String, Vec<f32>>>,
}

impl InProcessVectorIndex {
    /// `path: None` keeps the index purely in memory
    pub fn new(dimension: usize, metric: DistanceMetric, path: Option<PathBuf>) -> Self {
        Self {
            dimension,
            metric,
            path,
            vectors: RwLock::new(HashMap::new()),
        }
    }

    fn io_err(e: impl std::fmt::Display) -> DomainError {
        DomainError::Repository(format!("vector snapshot: {}", e))
    }
}

#[async_trait]
impl VectorIndex for InProcessVectorIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn backend(&self) -> &'static str {
        "in_process"
    }

    async fn add(&self, id: &str, vector: Vec<f32>) -> Result<(), DomainError> {
        DomainError::check_dimension(self.dimension, &vector)?;
        self.vectors.write().await.insert(id.to_string(), vector);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool, DomainError> {
        Ok(self.vectors.write().await.remove(id).is_some())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredId>, DomainError> {
        DomainError::check_dimension(self.dimension, vector)?;
        let vectors = self.vectors.read().await;
        let mut hits: Vec<ScoredId> = vectors
            .iter()
            .map(|(id, stored)| ScoredId {
                id: id.clone(),
                score: similarity(self.metric, vector, stored),
            })
            .collect();
        hits.sort_by(|a, b| cmp_score_desc(a.score, b.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(k);
        Ok(hits)
    }

    async fn ids(&self) -> Result<Vec<String>, DomainError> {
        Ok(self.vectors.read().await.keys().cloned().collect())
    }

    async fn len(&self) -> Result<usize, DomainError> {
        Ok(self.vectors.read().await.len())
    }

    async fn persist(&self) -> Result<(), DomainError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot = Snapshot {
            dimension: self.dimension,
            metric: self.metric,
            vectors: self.vectors.read().await.clone(),
        };
        let bytes = serde_json::to_vec(&snapshot).map_err(Self::io_err)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(Self::io_err)?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(Self::io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(Self::io_err)?;

        tracing::debug!(path = %path.display(), count = snapshot.vectors.len(), "Vector snapshot written");
        Ok(())
    }

    async fn load(&self) -> Result<(), DomainError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No vector snapshot yet, starting empty");
                self.vectors.write().await.clear();
                return Ok(());
            }
            Err(e) => return Err(Self::io_err(e)),
        };
        let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(Self::io_err)?;
        if snapshot.dimension != self.dimension {
            return Err(DomainError::DimensionMismatch {
                expected: self.dimension,
                actual: snapshot.dimension,
            });
        }
        if snapshot.metric != self.metric {
            tracing::warn!(
                stored = %snapshot.metric,
                configured = %self.metric,
                "Snapshot metric differs from configuration; scores use the configured metric"
            );
        }

        let total = snapshot.vectors.len();
        let vectors: HashMap<String, Vec<f32>> = snapshot
            .vectors
            .into_iter()
            .filter(|(_, v)| v.len() == self.dimension)
            .collect();
        if vectors.len() != total {
            tracing::warn!(dropped = total - vectors.len(), "Dropped malformed vectors from snapshot");
        }

        tracing::info!(path = %path.display(), count = vectors.len(), "Vector snapshot loaded");
        *self.vectors.write().await = vectors;
        Ok(())
    }
}
