use std::path::PathBuf;
use thiserror::Error;

pub type WatchResult<T> = std::result::Result<T, WatchError>;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Watch directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Watch path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),
}
