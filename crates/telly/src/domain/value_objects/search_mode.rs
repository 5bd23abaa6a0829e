//! SearchMode - Which ranking path actually produced a result set

use serde::{Deserialize, Serialize};

/// Search mode reported alongside search results
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Vector similarity only
    Semantic,
    /// Vector similarity blended with keyword matching
    Hybrid,
    /// Keyword substring matching; the embedding backend was unavailable
    Keyword,
}

impl SearchMode {
    pub fn is_degraded(&self) -> bool {
        matches!(self, SearchMode::Keyword)
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::Semantic => write!(f, "semantic"),
            SearchMode::Hybrid => write!(f, "hybrid"),
            SearchMode::Keyword => write!(f, "keyword"),
        }
    }
}
