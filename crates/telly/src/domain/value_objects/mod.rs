//! Value Objects
//!
//! Immutable objects defined by their attributes rather than identity.

mod distance_metric;
mod episode_type;
mod event_type;
mod memory_priority;
mod search_mode;
mod tag_match_mode;

pub use distance_metric::*;
pub use episode_type::*;
pub use event_type::*;
pub use memory_priority::*;
pub use search_mode::*;
pub use tag_match_mode::*;
