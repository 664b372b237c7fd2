//! # Proxy Stdio
//!
//! Byte-transparent plumbing between the supervisor's own standard streams
//! and those of its current child:
//! - supervisor stdin is pumped into whichever child is attached, and held
//!   while no child is attached
//! - child stdout/stderr are copied chunk by chunk, without framing, to the
//!   supervisor's stdout/stderr
//!
//! Children come and go; the bridge outlives them all.

pub mod bridge;
pub mod types;

// Re-export main types
pub use bridge::{BoxedReader, BoxedWriter, StdioBridge, StdioEndpoints};
pub use types::{BridgeStatus, StreamType};
