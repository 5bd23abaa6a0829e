//! Feature-hashing embedder.
//!
//! Lowercased words are hashed into buckets and the vector is L2-normalized,
//! so texts sharing words score higher under cosine similarity. Used when no
//! embedding provider is configured and in tests, where it must be
//! reproducible across runs.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use telly::domain::services::normalize;
use telly::{DomainError, EmbeddingService};

pub struct HashingEmbedding {
    dimension: usize,
    available: AtomicBool,
}

impl HashingEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            available: AtomicBool::new(true),
        }
    }

    /// Simulate a provider outage; `embed` fails while unavailable
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn embed_now(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        if self.dimension == 0 {
            return vector;
        }
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = (fnv1a(&word.to_lowercase()) % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }
        normalize(&mut vector);
        vector
    }
}

/// FNV-1a; stable across processes unlike the std hasher
fn fnv1a(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl EmbeddingService for HashingEmbedding {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(DomainError::ExternalService(
                "embedding provider unavailable".into(),
            ));
        }
        Ok(self.embed_now(text))
    }
}
