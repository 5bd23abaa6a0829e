//! Telly API Routes
//!
//! - /memories - Long-term store
//! - /sessions/:session_id - Short-term memory, chat turns and context
//! - /episodes - Episodic recorder
//! - /transcripts - Transcript store

pub mod episode;
pub mod memory;
pub mod session;
pub mod swagger;
pub mod transcript;

use axum::http::StatusCode;

use telly::DomainError;

/// Error half of every handler result
pub type ApiError = (StatusCode, String);

/// Map a domain error onto its HTTP status
pub fn api_error(e: DomainError) -> ApiError {
    let status = match &e {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Validation(_) | DomainError::DimensionMismatch { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::BackendTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        DomainError::ExternalService(_) | DomainError::DegradedSearch(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        DomainError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(status = %status, error = %e, "Request failed");
    }
    (status, e.to_string())
}

pub(crate) fn bad_request(message: String) -> ApiError {
    (StatusCode::UNPROCESSABLE_ENTITY, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            api_error(DomainError::not_found_str("Memory", "m1")).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            api_error(DomainError::timeout("vector.search", 5000)).0,
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            api_error(DomainError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
            .0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            api_error(DomainError::DegradedSearch("down".into())).0,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
