//! SupervisorActor - the single task that owns all supervisor state
//!
//! Every input (child exits, timers, file changes, signals, handle requests)
//! arrives on one unbounded event channel and is handled to completion before
//! the next one. Timers are plain sleep tasks that post an event; they are
//! never cancelled; the handler re-checks state when the event arrives.

use super::child::ChildProcessHandle;
use super::events::SupervisorEvent;
use super::types::{ShutdownSource, SupervisorOutcome, SupervisorReport, SupervisorStatus};
use crate::config::SupervisorConfig;
use crate::lifecycle::{RestartDecision, RestartPolicy};
use proxy_common::{ProcessError, ProcessResult};
use proxy_process_state::{SupervisorState, SupervisorStateMachine};
use proxy_stdio::StdioBridge;
use proxy_watch::FileWatcher;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How long to wait for the exit of a child that was sent SIGKILL
const KILL_CONFIRM_TIMEOUT: Duration = Duration::from_secs(1);

/// How long to keep forwarding output of the last child after termination
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
struct SupervisorFlags {
    is_shutting_down: bool,
    should_restart: bool,
}

#[derive(Debug, Default)]
struct SupervisorStats {
    spawn_attempts: u32,
    intentional_restarts: u32,
    forced_kills: u32,
}

pub(super) struct SupervisorActor {
    config: SupervisorConfig,
    state: SupervisorStateMachine,
    policy: RestartPolicy,
    flags: SupervisorFlags,
    stats: SupervisorStats,
    child: Option<ChildProcessHandle>,
    next_generation: u64,
    bridge: StdioBridge,
    watcher: Option<FileWatcher>,
    /// Forwarders (signals, stdin EOF) stopped when the actor exits
    aux_tasks: Vec<JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<SupervisorEvent>,
    status_tx: watch::Sender<SupervisorStatus>,
    outcome: Option<SupervisorOutcome>,
}

impl SupervisorActor {
    pub(super) fn new(
        config: SupervisorConfig,
        bridge: StdioBridge,
        events_tx: mpsc::UnboundedSender<SupervisorEvent>,
        status_tx: watch::Sender<SupervisorStatus>,
    ) -> Self {
        let policy = RestartPolicy::from_config(&config.restart);

        Self {
            config,
            state: SupervisorStateMachine::new("supervisor"),
            policy,
            flags: SupervisorFlags {
                is_shutting_down: false,
                should_restart: true,
            },
            stats: SupervisorStats::default(),
            child: None,
            next_generation: 1,
            bridge,
            watcher: None,
            aux_tasks: Vec::new(),
            events_tx,
            status_tx,
            outcome: None,
        }
    }

    pub(super) fn bridge(&self) -> &StdioBridge {
        &self.bridge
    }

    pub(super) fn set_watcher(&mut self, watcher: FileWatcher) {
        if self.flags.is_shutting_down {
            return;
        }
        self.watcher = Some(watcher);
    }

    pub(super) fn add_aux_task(&mut self, task: JoinHandle<()>) {
        self.aux_tasks.push(task);
    }

    pub(super) fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Main event loop. Returns once the supervisor reached `Terminated`.
    pub(super) async fn run(
        mut self,
        mut events_rx: mpsc::UnboundedReceiver<SupervisorEvent>,
    ) -> SupervisorReport {
        while self.outcome.is_none() {
            match events_rx.recv().await {
                Some(event) => {
                    self.handle_event(event);
                    self.publish_status();
                }
                None => {
                    // The actor holds a sender itself, so this means a bug elsewhere
                    error!("Event channel closed unexpectedly");
                    self.finish(SupervisorOutcome::Graceful, "event channel closed");
                }
            }
        }

        for task in self.aux_tasks.drain(..) {
            task.abort();
        }

        if !self.bridge.drain_output(OUTPUT_DRAIN_TIMEOUT).await {
            debug!("Stopped forwarding output of the last target process");
        }

        let outcome = self.outcome.unwrap_or(SupervisorOutcome::Graceful);
        info!(
            ?outcome,
            spawn_attempts = self.stats.spawn_attempts,
            intentional_restarts = self.stats.intentional_restarts,
            forced_kills = self.stats.forced_kills,
            "Supervisor terminated"
        );

        SupervisorReport {
            outcome,
            spawn_attempts: self.stats.spawn_attempts,
            intentional_restarts: self.stats.intentional_restarts,
            forced_kills: self.stats.forced_kills,
            state_history: self.state.state_history().to_vec(),
            stdio: self.bridge.status(),
        }
    }

    fn handle_event(&mut self, event: SupervisorEvent) {
        match event {
            SupervisorEvent::ChildExited { generation, status } => {
                self.handle_child_exited(generation, status)
            }
            SupervisorEvent::ChildError { generation, error } => {
                self.handle_child_error(generation, error)
            }
            SupervisorEvent::RestartDue => self.handle_restart_due(),
            SupervisorEvent::GraceExpired { generation } => self.handle_grace_expired(generation),
            SupervisorEvent::AttemptsStable { generation } => {
                self.handle_attempts_stable(generation)
            }
            SupervisorEvent::FileChanged { path } => self.handle_file_changed(path),
            SupervisorEvent::ShutdownRequested { source } => self.request_shutdown(source),
        }
    }

    // ------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------

    /// Try to start a new child. Spawn failures take the crash path.
    pub(super) fn spawn_target(&mut self) {
        if self.flags.is_shutting_down || self.outcome.is_some() {
            return;
        }
        if self.child.is_some() {
            warn!("Spawn requested while a target process is alive, ignoring");
            return;
        }

        log_transition(self.state.transition_to_spawning());
        self.stats.spawn_attempts += 1;

        let target = &self.config.target;
        info!(
            command = %target.command_line(),
            attempt = self.stats.spawn_attempts,
            "Starting target process"
        );

        let args = target.resolved_args();
        let spawned = proxy_process::spawn_piped(
            &target.command,
            &args,
            target.working_directory.as_deref(),
        );

        match spawned {
            Ok(mut child) => {
                let generation = self.next_generation;
                self.next_generation += 1;

                self.bridge.attach_child(generation, &mut child);
                let handle = ChildProcessHandle::monitor(child, generation, self.events_tx.clone());
                let pid = handle.pid();
                self.child = Some(handle);

                log_transition(self.state.transition_to_running(pid));
                info!(pid, generation, "Target process started successfully");

                let reset_after = self.config.restart.reset_after;
                if reset_after.is_zero() {
                    self.policy.reset();
                } else {
                    self.schedule(reset_after, SupervisorEvent::AttemptsStable { generation });
                }
            }
            Err(e) => {
                error!("Failed to start target process: {}", e);
                self.handle_crash(&format!("spawn failed: {}", e));
            }
        }
    }

    fn handle_restart_due(&mut self) {
        if self.flags.is_shutting_down || self.state.current_state() != SupervisorState::AwaitingRestart
        {
            debug!(state = %self.state.current_state(), "Ignoring stale restart timer");
            return;
        }
        self.spawn_target();
    }

    fn handle_attempts_stable(&mut self, generation: u64) {
        if self.flags.is_shutting_down {
            return;
        }
        if self.child.as_ref().map(|c| c.generation()) == Some(generation) {
            self.policy.reset();
        }
    }

    // ------------------------------------------------------------------
    // Child exit
    // ------------------------------------------------------------------

    fn handle_child_exited(&mut self, generation: u64, status: ExitStatus) {
        let description = describe_exit(&status);
        if status.success() {
            info!(generation, "Target process exited with {}", description);
        } else {
            warn!(generation, "Target process exited with {}", description);
        }
        self.handle_child_gone(generation, &description);
    }

    fn handle_child_error(&mut self, generation: u64, error: ProcessError) {
        error!(generation, "Target process error: {}", error);
        self.handle_child_gone(generation, &error.to_string());
    }

    fn handle_child_gone(&mut self, generation: u64, reason: &str) {
        let Some(child) = self.take_child(generation) else {
            debug!(generation, "Ignoring event from a previous target process");
            return;
        };
        self.bridge.detach(generation);
        debug!(
            generation,
            uptime_ms = child.uptime().num_milliseconds(),
            "Target process gone"
        );

        if self.flags.is_shutting_down {
            self.finish(SupervisorOutcome::Graceful, "Target process stopped");
            return;
        }

        if child.is_intentional_restart() {
            self.stats.intentional_restarts += 1;
            log_transition(
                self.state
                    .transition_to_awaiting_restart("Restarting after file change".to_string()),
            );
            self.spawn_target();
            return;
        }

        self.handle_crash(reason);
    }

    /// Count a failure against the budget and schedule the next spawn.
    fn handle_crash(&mut self, reason: &str) {
        if self.flags.is_shutting_down || !self.flags.should_restart {
            return;
        }

        log_transition(self.state.transition_to_awaiting_restart(reason.to_string()));

        match self.policy.on_failure() {
            RestartDecision::Retry { attempt, delay } => {
                info!(
                    attempt,
                    max_attempts = self.policy.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling restart in {}ms (attempt {}/{})",
                    delay.as_millis(),
                    attempt,
                    self.policy.max_attempts()
                );
                self.schedule(delay, SupervisorEvent::RestartDue);
            }
            RestartDecision::Exhausted { .. } => {
                error!(
                    "Max restart attempts ({}) reached. Exiting.",
                    self.policy.max_attempts()
                );
                self.flags.should_restart = false;
                self.finish(SupervisorOutcome::Exhausted, "Restart attempts exhausted");
            }
        }
    }

    // ------------------------------------------------------------------
    // Intentional restart
    // ------------------------------------------------------------------

    fn handle_file_changed(&mut self, path: std::path::PathBuf) {
        if self.flags.is_shutting_down {
            return;
        }
        let Some(child) = self.child.as_mut() else {
            debug!(path = %path.display(), "File changed while no target process is running");
            return;
        };
        if child.termination_requested() {
            debug!(path = %path.display(), "Restart already in progress");
            return;
        }

        info!("File change detected: {}, restarting target process...", path.display());
        info!(pid = child.pid(), "Terminating target process for restart...");
        child.mark_intentional_restart();
        child.request_termination();

        let generation = child.generation();
        self.schedule(
            self.config.shutdown.restart_grace_timeout,
            SupervisorEvent::GraceExpired { generation },
        );
    }

    fn handle_grace_expired(&mut self, generation: u64) {
        let Some(child) = self.child.as_mut().filter(|c| c.generation() == generation) else {
            return;
        };

        if !child.kill_sent() {
            warn!(pid = child.pid(), "Force killing target process...");
            child.force_kill();
            self.stats.forced_kills += 1;
            self.schedule(KILL_CONFIRM_TIMEOUT, SupervisorEvent::GraceExpired { generation });
            return;
        }

        warn!(pid = child.pid(), "Target process did not exit after SIGKILL");
        if self.flags.is_shutting_down {
            self.child = None;
            self.bridge.detach(generation);
            self.finish(SupervisorOutcome::Graceful, "Target process killed");
        }
    }

    // ------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------

    /// Start the shutdown sequence. Idempotent.
    pub(super) fn request_shutdown(&mut self, source: ShutdownSource) {
        if self.flags.is_shutting_down || self.outcome.is_some() {
            debug!(%source, "Shutdown already in progress");
            return;
        }

        info!(%source, "Shutting down proxy...");
        self.flags.is_shutting_down = true;
        self.flags.should_restart = false;
        self.watcher = None;

        log_transition(
            self.state
                .transition_to_shutting_down(format!("Shutdown requested ({})", source)),
        );

        if self.child.is_none() {
            self.finish(SupervisorOutcome::Graceful, "No target process running");
            return;
        }
        let Some(child) = self.child.as_mut() else {
            return;
        };

        info!(pid = child.pid(), "Terminating target process...");
        child.request_termination();

        let generation = child.generation();
        self.schedule(
            self.config.shutdown.grace_timeout,
            SupervisorEvent::GraceExpired { generation },
        );
    }

    fn finish(&mut self, outcome: SupervisorOutcome, reason: &str) {
        if self.outcome.is_some() {
            return;
        }

        log_transition(self.state.transition_to_terminated(reason.to_string()));
        self.outcome = Some(outcome);
        self.flags.should_restart = false;
        self.watcher = None;

        match outcome {
            SupervisorOutcome::Graceful => info!("Shutdown complete"),
            SupervisorOutcome::Exhausted => error!("Supervisor giving up"),
        }
        self.publish_status();
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Take the child handle if it belongs to `generation`
    fn take_child(&mut self, generation: u64) -> Option<ChildProcessHandle> {
        if self.child.as_ref().map(|c| c.generation()) == Some(generation) {
            self.child.take()
        } else {
            None
        }
    }

    /// Post `event` after `delay`. The timer is never cancelled.
    fn schedule(&self, delay: Duration, event: SupervisorEvent) {
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events_tx.send(event);
        });
    }

    pub(super) fn status(&self) -> SupervisorStatus {
        SupervisorStatus {
            state: self.state.current_state(),
            state_since: self.state.last_transition_time(),
            generation: self.child.as_ref().map(|c| c.generation()),
            pid: self.child.as_ref().and_then(|c| c.pid()),
            attempt_count: self.policy.attempt_count(),
            last_failure: self.policy.last_failure_time(),
            spawn_attempts: self.stats.spawn_attempts,
            intentional_restarts: self.stats.intentional_restarts,
            forced_kills: self.stats.forced_kills,
            shutting_down: self.flags.is_shutting_down,
        }
    }

    pub(super) fn publish_status(&self) {
        self.status_tx.send_replace(self.status());
    }
}

/// Invalid transitions are logged and otherwise ignored
fn log_transition(result: ProcessResult<()>) {
    if let Err(e) = result {
        warn!("{}", e);
    }
}

fn describe_exit(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("code {}", code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal {}", signal);
        }
    }

    "unknown status".to_string()
}
