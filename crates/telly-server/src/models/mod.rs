//! HTTP request/response models
//!
//! - Memory: long-term store and session short-term memory
//! - Episode: episodic recorder
//! - Transcript: transcript store

mod episode;
mod memory;
mod transcript;

pub use episode::*;
pub use memory::*;
pub use transcript::*;

use serde::Deserialize;
use utoipa::IntoParams;

/// Optional `?limit=` query
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    pub fn or(&self, default: usize) -> usize {
        self.limit.unwrap_or(default)
    }
}
