//! Recursive directory watcher built on `notify`.

use crate::error::{WatchError, WatchResult};
use crate::filter::{is_relevant, normalize_extensions};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What to report and how eagerly.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// File extensions (with leading dot) that count as relevant
    pub extensions: Vec<String>,
    /// Quiet period that folds a burst of events into one notification
    pub debounce: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            extensions: vec![".js".to_string(), ".json".to_string()],
            debounce: Duration::from_millis(100),
        }
    }
}

/// Watches one directory tree for as long as it is alive.
pub struct FileWatcher {
    directory: PathBuf,
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("directory", &self.directory)
            .finish()
    }
}

impl FileWatcher {
    /// Start watching `directory` recursively.
    ///
    /// `on_change` is invoked with the first relevant path of each debounced
    /// burst. Returning `false` stops the watcher's forwarding task.
    /// Must be called from within a Tokio runtime.
    pub fn start<F>(directory: impl Into<PathBuf>, options: WatchOptions, on_change: F) -> WatchResult<Self>
    where
        F: FnMut(PathBuf) -> bool + Send + 'static,
    {
        let directory = directory.into();
        if !directory.exists() {
            return Err(WatchError::MissingDirectory(directory));
        }
        if !directory.is_dir() {
            return Err(WatchError::NotADirectory(directory));
        }

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = raw_tx.send(res);
            },
            notify::Config::default(),
        )?;
        watcher.watch(&directory, RecursiveMode::Recursive)?;

        let options = WatchOptions {
            extensions: normalize_extensions(&options.extensions),
            ..options
        };
        debug!(
            directory = %directory.display(),
            extensions = ?options.extensions,
            debounce_ms = options.debounce.as_millis() as u64,
            "File watcher started"
        );

        let task = tokio::spawn(forward_changes(raw_rx, options, on_change));

        Ok(Self {
            directory,
            _watcher: watcher,
            task,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.task.abort();
        debug!(directory = %self.directory.display(), "File watcher stopped");
    }
}

async fn forward_changes<F>(
    mut raw: mpsc::UnboundedReceiver<notify::Result<Event>>,
    options: WatchOptions,
    mut on_change: F,
) where
    F: FnMut(PathBuf) -> bool,
{
    while let Some(result) = raw.recv().await {
        let Some(path) = relevant_path(result, &options.extensions) else {
            continue;
        };

        if !options.debounce.is_zero() {
            let deadline = tokio::time::Instant::now() + options.debounce;
            while let Ok(Some(_)) = tokio::time::timeout_at(deadline, raw.recv()).await {}
        }

        debug!(path = %path.display(), "Relevant file change");
        if !on_change(path) {
            break;
        }
    }
}

fn relevant_path(result: notify::Result<Event>, extensions: &[String]) -> Option<PathBuf> {
    match result {
        Ok(event) => {
            // Opening or reading a file is not a change
            if matches!(event.kind, EventKind::Access(_)) {
                return None;
            }
            event.paths.into_iter().find(|p| is_relevant(p, extensions))
        }
        Err(e) => {
            warn!(error = %e, "File watch error");
            None
        }
    }
}
