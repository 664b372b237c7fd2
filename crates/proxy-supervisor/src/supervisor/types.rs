//! Public types reported by the supervisor

use chrono::{DateTime, Utc};
use proxy_process_state::{StateTransition, SupervisorState};
use proxy_stdio::BridgeStatus;
use serde::Serialize;
use std::fmt;

/// Why a shutdown was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShutdownSource {
    /// OS signal, by name ("SIGTERM", "SIGINT", "CTRL_C")
    Signal(&'static str),
    /// Supervisor stdin reached EOF with `stdio.shutdown_on_stdin_eof`
    StdinClosed,
    /// Programmatic request through the handle
    Requested,
}

impl fmt::Display for ShutdownSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSource::Signal(name) => write!(f, "{}", name),
            ShutdownSource::StdinClosed => write!(f, "stdin closed"),
            ShutdownSource::Requested => write!(f, "shutdown requested"),
        }
    }
}

/// How the supervisor ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SupervisorOutcome {
    /// Shutdown ran to completion
    Graceful,
    /// Restart attempts used up
    Exhausted,
}

impl SupervisorOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            SupervisorOutcome::Graceful => 0,
            SupervisorOutcome::Exhausted => 1,
        }
    }
}

/// Snapshot published after every event the supervisor handles
#[derive(Debug, Clone, Serialize)]
pub struct SupervisorStatus {
    pub state: SupervisorState,
    /// When `state` was entered
    pub state_since: DateTime<Utc>,
    /// Generation of the live child, if any
    pub generation: Option<u64>,
    pub pid: Option<u32>,
    /// Consecutive crash restarts counted against the budget
    pub attempt_count: u32,
    /// Time of the most recent crash or spawn failure
    pub last_failure: Option<DateTime<Utc>>,
    pub spawn_attempts: u32,
    pub intentional_restarts: u32,
    pub forced_kills: u32,
    pub shutting_down: bool,
}

impl Default for SupervisorStatus {
    fn default() -> Self {
        Self {
            state: SupervisorState::Idle,
            state_since: Utc::now(),
            generation: None,
            pid: None,
            attempt_count: 0,
            last_failure: None,
            spawn_attempts: 0,
            intentional_restarts: 0,
            forced_kills: 0,
            shutting_down: false,
        }
    }
}

/// Final summary returned once the supervisor terminated
#[derive(Debug, Clone, Serialize)]
pub struct SupervisorReport {
    pub outcome: SupervisorOutcome,
    /// Every spawn attempt, successful or not
    pub spawn_attempts: u32,
    /// File-triggered restarts
    pub intentional_restarts: u32,
    /// Children that needed SIGKILL
    pub forced_kills: u32,
    pub state_history: Vec<StateTransition>,
    pub stdio: BridgeStatus,
}

impl SupervisorReport {
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}
