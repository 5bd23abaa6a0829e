//! Short-Term Buffer - bounded recency window of a session's memories
//!
//! FIFO eviction: once `capacity` is exceeded the oldest item leaves the
//! buffer and is handed back to the caller. Eviction never touches copies
//! already promoted into the long-term store.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::domain::entities::MemoryItem;

use super::keyword::contains_ci;

/// Default capacity used when none is configured
pub const DEFAULT_SHORT_TERM_CAPACITY: usize = 200;

#[derive(Debug, Clone)]
pub struct ShortTermBuffer {
    capacity: usize,
    items: VecDeque<MemoryItem>,
}

impl ShortTermBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append an item, returning the evicted oldest item on overflow.
    pub fn add(&mut self, item: MemoryItem) -> Option<MemoryItem> {
        self.items.push_back(item);
        if self.items.len() > self.capacity {
            self.items.pop_front()
        } else {
            None
        }
    }

    /// Latest capture or retrieval in the buffer; `None` when empty
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.items
            .iter()
            .map(|m| m.created_at.max(m.last_accessed_at))
            .max()
    }

    /// Last `k` items, most recent first
    pub fn get_recent(&self, k: usize) -> Vec<MemoryItem> {
        self.items.iter().rev().take(k).cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<&MemoryItem> {
        self.items.iter().find(|m| m.id == id)
    }

    /// Record a retrieval of `id` and return the updated item
    pub fn touch(&mut self, id: &str, now: DateTime<Utc>) -> Option<MemoryItem> {
        let item = self.items.iter_mut().find(|m| m.id == id)?;
        item.record_access(now);
        Some(item.clone())
    }

    /// Store an embedding computed for an item still in the buffer
    pub fn set_embedding(&mut self, id: &str, embedding: Vec<f32>) -> bool {
        match self.items.iter_mut().find(|m| m.id == id) {
            Some(item) => {
                item.embedding = embedding;
                true
            }
            None => false,
        }
    }

    /// Substring search ranked by access count, then recency
    pub fn search(&self, query: &str, limit: usize) -> Vec<MemoryItem> {
        let needle = query.trim().to_lowercase();
        let mut hits: Vec<MemoryItem> = self
            .items
            .iter()
            .filter(|m| contains_ci(&m.content, &needle))
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            b.access_count
                .cmp(&a.access_count)
                .then(b.last_accessed_at.cmp(&a.last_accessed_at))
        });
        hits.truncate(limit);
        hits
    }

    pub fn remove(&mut self, id: &str) -> Option<MemoryItem> {
        let pos = self.items.iter().position(|m| m.id == id)?;
        self.items.remove(pos)
    }

    /// Oldest-first copy for readers that must not hold the lock
    pub fn snapshot(&self) -> Vec<MemoryItem> {
        self.items.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl Default for ShortTermBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SHORT_TERM_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(content: &str) -> MemoryItem {
        MemoryItem::new(content, Utc::now())
    }

    fn contents(items: &[MemoryItem]) -> Vec<&str> {
        items.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_fifo_eviction_capacity_three() {
        let mut buf = ShortTermBuffer::new(3);
        assert!(buf.add(item("A")).is_none());
        assert!(buf.add(item("B")).is_none());
        assert!(buf.add(item("C")).is_none());
        let evicted = buf.add(item("D")).expect("A should be evicted");

        assert_eq!(evicted.content, "A");
        assert_eq!(contents(&buf.snapshot()), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_holds_exactly_the_most_recent_n() {
        let mut buf = ShortTermBuffer::new(4);
        let names: Vec<String> = (0..25).map(|i| format!("m{i}")).collect();
        for (i, name) in names.iter().enumerate() {
            buf.add(item(name));
            assert!(buf.len() <= 4);
            let start = (i + 1).saturating_sub(4);
            let expected: Vec<&str> = names[start..=i].iter().map(String::as_str).collect();
            assert_eq!(contents(&buf.snapshot()), expected);
        }
    }

    #[test]
    fn test_zero_capacity_evicts_immediately() {
        let mut buf = ShortTermBuffer::new(0);
        let evicted = buf.add(item("A")).unwrap();
        assert_eq!(evicted.content, "A");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_get_recent_most_recent_first() {
        let mut buf = ShortTermBuffer::new(10);
        for name in ["A", "B", "C"] {
            buf.add(item(name));
        }
        assert_eq!(contents(&buf.get_recent(2)), vec!["C", "B"]);
        assert_eq!(contents(&buf.get_recent(50)), vec!["C", "B", "A"]);
        assert!(buf.get_recent(0).is_empty());
    }

    #[test]
    fn test_touch_increments_access() {
        let mut buf = ShortTermBuffer::new(2);
        let a = item("A");
        let id = a.id.clone();
        buf.add(a);
        let touched = buf.touch(&id, Utc::now()).unwrap();
        assert_eq!(touched.access_count, 1);
        assert_eq!(buf.get(&id).unwrap().access_count, 1);
        assert!(buf.touch("missing", Utc::now()).is_none());
    }

    #[test]
    fn test_search_ranks_by_access() {
        let mut buf = ShortTermBuffer::new(10);
        let a = item("rust ownership");
        let b = item("rust lifetimes");
        let b_id = b.id.clone();
        buf.add(a);
        buf.add(b);
        buf.add(item("python"));
        buf.touch(&b_id, Utc::now());

        let hits = buf.search("RUST", 5);
        assert_eq!(contents(&hits), vec!["rust lifetimes", "rust ownership"]);
    }
}
