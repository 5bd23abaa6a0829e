//! Memory Repository Port
//!
//! Durable record set for long-term MemoryItems. Vectors are indexed
//! separately by a `VectorIndex`; this store keeps the metadata and the
//! embedding needed to rebuild the index.

use async_trait::async_trait;

use crate::domain::{errors::DomainError, MemoryItem, MemoryPriority, TagMatchMode};

/// Search filter for memory queries
#[derive(Debug, Default, Clone)]
pub struct MemorySearchFilter {
    /// Filter by tags
    pub tags: Vec<String>,
    /// Tag matching mode
    pub tags_match_mode: TagMatchMode,
    /// Minimum priority
    pub min_priority: Option<MemoryPriority>,
    /// Only memories captured in this session
    pub session_id: Option<String>,
}

impl MemorySearchFilter {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.min_priority.is_none() && self.session_id.is_none()
    }

    pub fn matches(&self, item: &MemoryItem) -> bool {
        if !self.tags_match_mode.matches(&self.tags, &item.tags) {
            return false;
        }
        if let Some(min) = self.min_priority {
            if item.priority < min {
                return false;
            }
        }
        if let Some(session_id) = &self.session_id {
            if item.session_id.as_deref() != Some(session_id.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Repository interface for MemoryItem records
#[async_trait]
pub trait MemoryRepository: Send + Sync {
    /// Insert or replace a record by id
    async fn upsert(&self, item: &MemoryItem) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<MemoryItem>, DomainError>;

    async fn find_all(&self) -> Result<Vec<MemoryItem>, DomainError>;

    /// Returns true when a record was deleted
    async fn delete(&self, id: &str) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_filter_matches() {
        let item = MemoryItem::new("x", Utc::now())
            .with_session("s1")
            .with_tags(vec!["rust".into(), "async".into()])
            .with_priority(MemoryPriority::High);

        assert!(MemorySearchFilter::default().matches(&item));

        let all = MemorySearchFilter {
            tags: vec!["rust".into(), "tokio".into()],
            tags_match_mode: TagMatchMode::All,
            ..Default::default()
        };
        assert!(!all.matches(&item));

        let any = MemorySearchFilter {
            tags: vec!["rust".into(), "tokio".into()],
            ..Default::default()
        };
        assert!(any.matches(&item));

        let critical = MemorySearchFilter {
            min_priority: Some(MemoryPriority::Critical),
            ..Default::default()
        };
        assert!(!critical.matches(&item));

        let other_session = MemorySearchFilter {
            session_id: Some("s2".into()),
            ..Default::default()
        };
        assert!(!other_session.matches(&item));
    }
}
