//! Repository Ports
//!
//! Abstract interfaces for durable record sets, one per entity type.

mod episode_repository;
mod memory_repository;
mod transcript_repository;

pub use episode_repository::*;
pub use memory_repository::*;
pub use transcript_repository::*;
