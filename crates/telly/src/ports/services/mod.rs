//! Service Ports
//!
//! Abstract interfaces for external services.

mod clock;
mod embedding;
mod vector_index;

pub use clock::*;
pub use embedding::*;
pub use vector_index::*;
