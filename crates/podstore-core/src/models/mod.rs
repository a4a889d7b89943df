//! Data models for the storage gateway
//!
//! Organized by concern: file categories, the calling principal, and the
//! transient values handed back to callers.

mod category;
mod object;
mod principal;

pub use category::*;
pub use object::*;
pub use principal::*;
