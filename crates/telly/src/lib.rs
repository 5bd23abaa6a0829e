//! Telly Memory Core
//!
//! Domain types and interfaces for the chat assistant's memory subsystem:
//! a per-session short-term buffer, a semantic long-term store, an episode
//! recorder and a transcript store.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain/`): Pure entities and algorithms
//!   - `entities/`: MemoryItem, Episode, TranscriptRecord
//!   - `value_objects/`: EpisodeType, EventType, MemoryPriority, DistanceMetric, ...
//!   - `services/`: ShortTermBuffer, similarity and keyword scoring
//!   - `errors`: DomainError
//!
//! - **Ports** (`ports/`): Abstract interfaces (traits)
//!   - `repositories/`: Durable record sets
//!   - `services/`: Embedding, vector index, clock
//!
//! # Usage
//!
//! ```rust,ignore
//! use telly::domain::{Episode, MemoryItem};
//! use telly::ports::{EpisodeRepository, VectorIndex};
//! ```

pub mod domain;
pub mod ports;

pub use domain::services::ShortTermBuffer;
pub use domain::{
    ConversationTurn, DistanceMetric, DomainError, Episode, EpisodeMetrics, EpisodeStatus,
    EpisodeType, Event, EventType, MemoryItem, MemoryPriority, MemorySource, NewEvent,
    SearchMode, TagMatchMode, TranscriptRecord,
};
pub use ports::{
    Clock, EmbeddingService, EpisodeRepository, ManualClock, MemoryRepository,
    MemorySearchFilter, ScoredId, SystemClock, TranscriptRepository, VectorIndex,
};
