//! Domain Entities
//!
//! Pure domain models without infrastructure dependencies.
//! - MemoryItem: short-term / long-term memory unit
//! - Episode: recorded conversation session with its event log
//! - TranscriptRecord: processed video transcript

mod episode;
mod memory;
mod transcript;

pub use episode::*;
pub use memory::*;
pub use transcript::*;
