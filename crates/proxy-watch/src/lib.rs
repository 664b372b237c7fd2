//! # Proxy Watch
//!
//! Watches the directory holding the child's build artifact and reports
//! changes to files with recognised extensions, so the supervisor can
//! reload the child after a rebuild.

pub mod error;
pub mod filter;
pub mod watcher;

pub use error::{WatchError, WatchResult};
pub use filter::{derive_watch_dir, is_relevant, normalize_extensions};
pub use watcher::{FileWatcher, WatchOptions};
