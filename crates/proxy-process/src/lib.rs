//! # Proxy Process
//!
//! Low-level process operations used by the supervisor:
//! - Spawning the child with all three stdio streams piped
//! - Graceful termination (SIGTERM) and forced kill (SIGKILL) by pid
//! - Process existence checks

pub mod check;
pub mod execute;
pub mod terminate;

// Re-export main types
pub use check::*;
pub use execute::*;
pub use terminate::*;
