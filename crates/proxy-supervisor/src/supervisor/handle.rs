//! SupervisorHandle - public API for a running supervisor

use super::events::SupervisorEvent;
use super::types::{ShutdownSource, SupervisorReport, SupervisorStatus};
use proxy_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Handle to a started supervisor.
///
/// Requests are posted to the actor's event queue and handled in order with
/// every other event. Dropping the handle does not stop the supervisor.
#[derive(Debug)]
pub struct SupervisorHandle {
    events_tx: mpsc::UnboundedSender<SupervisorEvent>,
    status_rx: watch::Receiver<SupervisorStatus>,
    watch_directory: Option<PathBuf>,
    task: JoinHandle<SupervisorReport>,
}

impl SupervisorHandle {
    pub(super) fn new(
        events_tx: mpsc::UnboundedSender<SupervisorEvent>,
        status_rx: watch::Receiver<SupervisorStatus>,
        watch_directory: Option<PathBuf>,
        task: JoinHandle<SupervisorReport>,
    ) -> Self {
        Self {
            events_tx,
            status_rx,
            watch_directory,
            task,
        }
    }

    /// Start a graceful shutdown. Repeated requests are ignored.
    pub fn request_shutdown(&self) -> Result<()> {
        self.send(SupervisorEvent::ShutdownRequested {
            source: ShutdownSource::Requested,
        })
    }

    /// Report a changed file as if the watcher had seen it.
    pub fn notify_file_change(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.send(SupervisorEvent::FileChanged { path: path.into() })
    }

    /// Latest published status
    pub fn status(&self) -> SupervisorStatus {
        self.status_rx.borrow().clone()
    }

    /// Wait until the status satisfies `predicate`, up to `limit`.
    pub async fn wait_for<F>(&self, limit: Duration, mut predicate: F) -> Result<SupervisorStatus>
    where
        F: FnMut(&SupervisorStatus) -> bool,
    {
        let mut status_rx = self.status_rx.clone();
        let waited = tokio::time::timeout(limit, status_rx.wait_for(|s| predicate(s))).await;

        match waited {
            Ok(Ok(status)) => Ok(status.clone()),
            Ok(Err(_)) => Err(Error::internal("Supervisor stopped before the condition was met")),
            Err(_) => Err(Error::internal(format!(
                "Timed out after {:?} waiting for supervisor status (last: {:?})",
                limit,
                self.status_rx.borrow().state
            ))),
        }
    }

    /// Directory being watched for changes, if watching is active
    pub fn watch_directory(&self) -> Option<&Path> {
        self.watch_directory.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the supervisor to terminate and return its report.
    pub async fn wait(self) -> Result<SupervisorReport> {
        self.task
            .await
            .map_err(|e| Error::internal(format!("Supervisor task failed: {}", e)))
    }

    fn send(&self, event: SupervisorEvent) -> Result<()> {
        self.events_tx
            .send(event)
            .map_err(|_| Error::internal("Supervisor is no longer running"))
    }
}
