//! Shared Types

pub mod analytics;
pub mod message;

pub use analytics::*;
pub use message::*;
