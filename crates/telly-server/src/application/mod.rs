//! Application Layer (Use Cases)
//!
//! Orchestrates domain operations and coordinates between
//! repositories, vector indexes and the embedding service.

mod consistency;
mod context_service;
mod deadline;
mod episode_service;
mod locks;
mod long_term_service;
mod session_service;
mod transcript_service;

pub use consistency::ConsistencyReport;
pub use context_service::{ContextEntry, ContextService, ContextTier, TurnContext};
pub use deadline::Deadline;
pub use episode_service::{summary_memory_id, EpisodeHit, EpisodeSearch, EpisodeService, StartEpisode};
pub use long_term_service::{Consolidation, LongTermService, ScoredMemory};
pub use session_service::{Capture, Recall, SessionContext, SessionMemoryService};
pub use transcript_service::{
    SaveTranscript, TranscriptHit, TranscriptSearch, TranscriptService, TranscriptStats,
};
