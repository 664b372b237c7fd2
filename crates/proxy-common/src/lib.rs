//! # Proxy Common
//!
//! Error types shared across the mcp-proxy crates.

pub mod errors;

// Re-export commonly used items
pub use errors::{Error, ProcessError, ProcessResult, Result, ResultExt};
