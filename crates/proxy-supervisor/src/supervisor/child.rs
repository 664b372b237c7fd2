//! Ownership of one live child process

use super::events::SupervisorEvent;
use chrono::{DateTime, Utc};
use proxy_common::ProcessError;
use tokio::process::Child;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Signals the actor asks the monitor task to deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChildSignal {
    Terminate,
    Kill,
}

/// The actor's view of the running child.
///
/// The `Child` itself lives in the monitor task, which is the only place that
/// may reap it. Signals go through `control` so they are never sent to a pid
/// that was already reaped and possibly reused.
#[derive(Debug)]
pub(crate) struct ChildProcessHandle {
    generation: u64,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    control: mpsc::UnboundedSender<ChildSignal>,
    termination_requested: bool,
    kill_sent: bool,
    intentional_restart: bool,
}

impl ChildProcessHandle {
    /// Hand `child` to a monitor task that reports exactly one terminal
    /// event (`ChildExited` or `ChildError`) for `generation`.
    pub(crate) fn monitor(
        child: Child,
        generation: u64,
        events: mpsc::UnboundedSender<SupervisorEvent>,
    ) -> Self {
        let pid = child.id();
        let (control, control_rx) = mpsc::unbounded_channel();

        tokio::spawn(watch_child(child, generation, control_rx, events));
        debug!(generation, pid, "Exit monitor task spawned");

        Self {
            generation,
            pid,
            started_at: Utc::now(),
            control,
            termination_requested: false,
            kill_sent: false,
            intentional_restart: false,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub(crate) fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }

    pub(crate) fn termination_requested(&self) -> bool {
        self.termination_requested
    }

    pub(crate) fn kill_sent(&self) -> bool {
        self.kill_sent
    }

    pub(crate) fn is_intentional_restart(&self) -> bool {
        self.intentional_restart
    }

    /// Mark the coming exit as a file-triggered restart
    pub(crate) fn mark_intentional_restart(&mut self) {
        self.intentional_restart = true;
    }

    /// Send SIGTERM once. Returns false if termination was already requested.
    pub(crate) fn request_termination(&mut self) -> bool {
        if self.termination_requested {
            return false;
        }
        self.termination_requested = true;
        let _ = self.control.send(ChildSignal::Terminate);
        true
    }

    pub(crate) fn force_kill(&mut self) {
        self.termination_requested = true;
        self.kill_sent = true;
        let _ = self.control.send(ChildSignal::Kill);
    }
}

async fn watch_child(
    mut child: Child,
    generation: u64,
    mut control: mpsc::UnboundedReceiver<ChildSignal>,
    events: mpsc::UnboundedSender<SupervisorEvent>,
) {
    let pid = child.id();

    let event = loop {
        tokio::select! {
            status = child.wait() => {
                break match status {
                    Ok(status) => SupervisorEvent::ChildExited { generation, status },
                    Err(e) => {
                        let _ = child.start_kill();
                        SupervisorEvent::ChildError {
                            generation,
                            error: ProcessError::wait_failed(pid, e.to_string()),
                        }
                    }
                };
            }
            Some(signal) = control.recv() => deliver(&mut child, signal),
        }
    };

    if events.send(event).is_err() {
        debug!(generation, pid, "Supervisor gone before child exit was reported");
    }
}

fn deliver(child: &mut Child, signal: ChildSignal) {
    // None once reaped; the exit is about to be reported
    let Some(pid) = child.id() else {
        return;
    };

    let result = match signal {
        ChildSignal::Terminate => proxy_process::terminate_gracefully(pid),
        ChildSignal::Kill => proxy_process::force_kill(pid),
    };

    match result {
        Ok(()) => debug!(pid, ?signal, "Signal delivered"),
        Err(ProcessError::Unsupported { .. }) => {
            if let Err(e) = child.start_kill() {
                warn!(pid, "Failed to kill target process: {}", e);
            }
        }
        Err(e) => warn!(pid, "{}", e),
    }
}
