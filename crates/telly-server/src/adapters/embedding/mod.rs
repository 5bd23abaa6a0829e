//! Embedding Adapters
//!
//! - `OpenAiEmbedding`: OpenAI embeddings endpoint
//! - `HashingEmbedding`: deterministic offline embedder (feature hashing)

mod hashing;
mod openai;

pub use hashing::HashingEmbedding;
pub use openai::OpenAiEmbedding;
