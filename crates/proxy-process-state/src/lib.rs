use chrono::{DateTime, Utc};
use proxy_common::errors::{ProcessError, ProcessResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of transitions kept in the history.
const MAX_HISTORY: usize = 100;

/// Lifecycle state of the supervisor and its single child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupervisorState {
    /// Constructed, nothing spawned yet
    Idle,
    /// A spawn attempt is in progress
    Spawning,
    /// A child is alive
    Running,
    /// No child alive; a restart is scheduled or about to be
    AwaitingRestart,
    /// Shutdown requested; waiting for the child to go away
    ShuttingDown,
    /// Final state, the supervisor is done
    Terminated,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorState::Idle => write!(f, "idle"),
            SupervisorState::Spawning => write!(f, "spawning"),
            SupervisorState::Running => write!(f, "running"),
            SupervisorState::AwaitingRestart => write!(f, "awaiting_restart"),
            SupervisorState::ShuttingDown => write!(f, "shutting_down"),
            SupervisorState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Supervisor state machine that validates and records transitions
#[derive(Debug, Clone)]
pub struct SupervisorStateMachine {
    name: String,
    current_state: SupervisorState,
    state_history: Vec<StateTransition>,
    last_transition_time: DateTime<Utc>,
}

/// Represents a state transition with timestamp and optional reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from_state: SupervisorState,
    pub to_state: SupervisorState,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

impl SupervisorStateMachine {
    /// Create a new state machine in the `Idle` state
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            current_state: SupervisorState::Idle,
            state_history: Vec::new(),
            last_transition_time: Utc::now(),
        }
    }

    pub fn current_state(&self) -> SupervisorState {
        self.current_state
    }

    /// Get the state history (bounded, oldest first)
    pub fn state_history(&self) -> &[StateTransition] {
        &self.state_history
    }

    pub fn last_transition_time(&self) -> DateTime<Utc> {
        self.last_transition_time
    }

    /// Check if a transition from the current state to `target_state` is legal
    pub fn is_valid_transition(&self, target_state: SupervisorState) -> bool {
        use SupervisorState::*;

        match (self.current_state, target_state) {
            // From Idle
            (Idle, Spawning) => true,

            // From Spawning
            (Spawning, Running) => true,
            (Spawning, AwaitingRestart) => true,
            (Spawning, Terminated) => true,

            // From Running
            (Running, AwaitingRestart) => true,
            (Running, ShuttingDown) => true,

            // From AwaitingRestart
            (AwaitingRestart, Spawning) => true,
            (AwaitingRestart, ShuttingDown) => true,
            (AwaitingRestart, Terminated) => true,

            // From ShuttingDown
            (ShuttingDown, Terminated) => true,

            // Terminated is final, and nothing else is legal
            _ => false,
        }
    }

    /// Transition to a new state with optional reason
    pub fn transition_to(
        &mut self,
        target_state: SupervisorState,
        reason: Option<String>,
    ) -> ProcessResult<()> {
        if !self.is_valid_transition(target_state) {
            return Err(ProcessError::invalid_state(
                &self.name,
                format!("a valid transition to {:?}", target_state),
                format!("{:?}", self.current_state),
            ));
        }

        let now = Utc::now();
        let from_state = self.current_state;
        self.state_history.push(StateTransition {
            from_state,
            to_state: target_state,
            timestamp: now,
            reason,
        });

        self.current_state = target_state;
        self.last_transition_time = now;

        if self.state_history.len() > MAX_HISTORY {
            self.state_history.remove(0);
        }

        tracing::debug!(
            "{} transitioned from {:?} to {:?}",
            self.name,
            from_state,
            self.current_state
        );

        Ok(())
    }

    pub fn transition_to_spawning(&mut self) -> ProcessResult<()> {
        self.transition_to(SupervisorState::Spawning, Some("Spawn requested".to_string()))
    }

    pub fn transition_to_running(&mut self, pid: Option<u32>) -> ProcessResult<()> {
        let reason = match pid {
            Some(pid) => format!("Child started (pid {})", pid),
            None => "Child started".to_string(),
        };
        self.transition_to(SupervisorState::Running, Some(reason))
    }

    pub fn transition_to_awaiting_restart(&mut self, reason: String) -> ProcessResult<()> {
        self.transition_to(SupervisorState::AwaitingRestart, Some(reason))
    }

    pub fn transition_to_shutting_down(&mut self, reason: String) -> ProcessResult<()> {
        self.transition_to(SupervisorState::ShuttingDown, Some(reason))
    }

    pub fn transition_to_terminated(&mut self, reason: String) -> ProcessResult<()> {
        self.transition_to(SupervisorState::Terminated, Some(reason))
    }
}
