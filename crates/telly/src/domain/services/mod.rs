//! Domain Services
//!
//! Stateless algorithms and in-memory structures shared by the stores.

mod keyword;
mod short_term;
mod similarity;

pub use keyword::*;
pub use short_term::*;
pub use similarity::*;
