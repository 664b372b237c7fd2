//! Single-child process supervisor built as an actor
//!
//! ## Structure
//!
//! - One actor task owns every piece of mutable state: the live child handle,
//!   the restart policy, the shutdown flags and the state machine.
//! - Child exits, timers, file changes, OS signals and handle requests all
//!   arrive as [`SupervisorEvent`](events::SupervisorEvent)s on one channel.
//! - [`SupervisorHandle`] is the public API. It only posts events and reads
//!   the published [`SupervisorStatus`].
//!
//! ## Timers
//!
//! Restart delays and grace windows are sleep tasks that post an event when
//! they fire. They are never cancelled. Instead every handler checks whether
//! the event still applies: a restart timer is dropped once shutdown began, a
//! grace timer is dropped once its child generation is gone.
//!
//! ## Restarts
//!
//! | Cause | Counted | Sequence |
//! |-------|---------|----------|
//! | Crash or spawn failure | yes | wait `restart.delay`, spawn |
//! | Watched file changed | no | SIGTERM, SIGKILL after `restart_grace_timeout`, spawn on exit |
//!
//! The attempt counter resets once a child has stayed up for
//! `restart.reset_after`. When it exceeds `restart.max_attempts` the
//! supervisor terminates with [`SupervisorOutcome::Exhausted`].
//!
//! ## Shutdown
//!
//! SIGINT/SIGTERM, stdin EOF (if configured) or
//! [`SupervisorHandle::request_shutdown`] send SIGTERM to the child and
//! escalate to SIGKILL after `shutdown.grace_timeout`. The supervisor then
//! terminates with [`SupervisorOutcome::Graceful`].

mod actor;
mod child;
pub(crate) mod events;
mod handle;
mod types;


pub use handle::SupervisorHandle;
pub use types::{
    ShutdownSource, SupervisorOutcome, SupervisorReport, SupervisorStatus,
};

use crate::config::SupervisorConfig;
use crate::signals::ShutdownSignals;
use actor::SupervisorActor;
use events::SupervisorEvent;
use proxy_common::{Result, ResultExt};
use proxy_stdio::{StdioBridge, StdioEndpoints};
use proxy_watch::{FileWatcher, WatchOptions};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Builder for a supervisor. Nothing happens until [`start`](Self::start).
#[derive(Debug)]
pub struct ProcessSupervisor {
    config: SupervisorConfig,
    endpoints: Option<StdioEndpoints>,
    handle_signals: bool,
}

impl ProcessSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            endpoints: None,
            handle_signals: true,
        }
    }

    /// Bridge the child to these streams instead of the process's own stdio.
    pub fn with_stdio(mut self, endpoints: StdioEndpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Do not install SIGINT/SIGTERM handlers; shutdown then only comes
    /// through the handle or stdin EOF.
    pub fn without_signal_handlers(mut self) -> Self {
        self.handle_signals = false;
        self
    }

    /// Register signal handlers, spawn the first child, start the watcher and
    /// hand the rest to the actor task.
    ///
    /// Only a failure to install the signal handlers is an error. A failed
    /// first spawn goes through the normal restart path.
    pub async fn start(self) -> Result<SupervisorHandle> {
        let signals = if self.handle_signals {
            Some(ShutdownSignals::register().context("Failed to start supervisor")?)
        } else {
            None
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SupervisorStatus::default());

        let config = self.config;
        let bridge = StdioBridge::new(self.endpoints.unwrap_or_else(StdioEndpoints::inherit));
        let mut actor = SupervisorActor::new(config.clone(), bridge, events_tx.clone(), status_tx);

        if let Some(mut signals) = signals {
            let tx = events_tx.clone();
            actor.add_aux_task(tokio::spawn(async move {
                while let Some(name) = signals.recv().await {
                    let event = SupervisorEvent::ShutdownRequested {
                        source: ShutdownSource::Signal(name),
                    };
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            }));
        }

        if config.stdio.shutdown_on_stdin_eof {
            let input_closed = actor.bridge().input_closed();
            let tx = events_tx.clone();
            actor.add_aux_task(tokio::spawn(async move {
                input_closed.cancelled().await;
                info!("Supervisor stdin closed");
                let _ = tx.send(SupervisorEvent::ShutdownRequested {
                    source: ShutdownSource::StdinClosed,
                });
            }));
        }

        info!("Starting supervisor");
        actor.spawn_target();

        let mut watch_directory = None;
        if config.watch.enabled && !actor.is_finished() {
            if let Some(watcher) = start_watcher(&config, events_tx.clone()) {
                watch_directory = Some(watcher.directory().to_path_buf());
                actor.set_watcher(watcher);
            }
        }

        actor.publish_status();
        let task = tokio::spawn(actor.run(events_rx));

        Ok(SupervisorHandle::new(events_tx, status_rx, watch_directory, task))
    }
}

fn start_watcher(
    config: &SupervisorConfig,
    events_tx: mpsc::UnboundedSender<SupervisorEvent>,
) -> Option<FileWatcher> {
    let directory = match config.watch_directory() {
        Ok(directory) => directory,
        Err(e) => {
            warn!("Cannot determine watch directory, file watching disabled: {:#}", e);
            return None;
        }
    };

    let options = WatchOptions {
        extensions: config.watch.extensions.clone(),
        debounce: config.watch.debounce,
    };

    let started = FileWatcher::start(&directory, options, move |path| {
        events_tx.send(SupervisorEvent::FileChanged { path }).is_ok()
    });

    match started {
        Ok(watcher) => {
            info!(
                extensions = ?config.watch.extensions,
                "Watching {} for changes",
                directory.display()
            );
            Some(watcher)
        }
        Err(e) => {
            warn!("{}, file watching disabled", e);
            None
        }
    }
}
