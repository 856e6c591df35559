//! Messaging Platform Common Library
//!
//! Shared message and analytics types used by the server and API clients.

pub mod types;

pub use types::*;
