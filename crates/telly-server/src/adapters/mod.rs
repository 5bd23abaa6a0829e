//! Infrastructure Adapters
//!
//! Implementations of domain ports for external systems.

pub mod embedding;
pub mod sqlite;
pub mod vector;

// Re-exports
pub use embedding::{HashingEmbedding, OpenAiEmbedding};
pub use sqlite::{SqliteEpisodeRepository, SqliteMemoryRepository, SqliteTranscriptRepository};
pub use vector::{build_index, InProcessVectorIndex, QdrantVectorIndex};
