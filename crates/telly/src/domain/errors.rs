//! Domain Errors
//!
//! Error taxonomy shared by every memory store. Backend-specific errors
//! (sqlx, qdrant, reqwest) are translated into these at the adapter boundary.

use thiserror::Error;
use uuid::Uuid;

/// Domain layer errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Semantic search unavailable: {0}")]
    DegradedSearch(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Backend timeout: {operation} exceeded {timeout_ms}ms")]
    BackendTimeout { operation: String, timeout_ms: u64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl DomainError {
    pub fn not_found<T: AsRef<str>>(entity_type: T, id: Uuid) -> Self {
        Self::NotFound {
            entity_type: entity_type.as_ref().to_string(),
            id: id.to_string(),
        }
    }

    pub fn not_found_str<T: AsRef<str>>(entity_type: T, id: &str) -> Self {
        Self::NotFound {
            entity_type: entity_type.as_ref().to_string(),
            id: id.to_string(),
        }
    }

    pub fn timeout<T: AsRef<str>>(operation: T, timeout_ms: u64) -> Self {
        Self::BackendTimeout {
            operation: operation.as_ref().to_string(),
            timeout_ms,
        }
    }

    /// Check an embedding against the dimension a store was configured with.
    pub fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), Self> {
        if vector.len() == expected {
            Ok(())
        } else {
            Err(Self::DimensionMismatch {
                expected,
                actual: vector.len(),
            })
        }
    }

    /// Failures that a semantic search path may degrade from instead of
    /// surfacing to the caller.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Self::BackendTimeout { .. }
                | Self::ExternalService(_)
                | Self::DegradedSearch(_)
                | Self::Repository(_)
        )
    }
}
