// Crash restart policy: a bounded attempt counter with a fixed delay

use crate::config::RestartSettings;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

/// What to do after a child crashed or failed to spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    /// Spawn again after `delay`; `attempt` is 1-based
    Retry { attempt: u32, delay: Duration },
    /// Budget used up after `attempts` failures
    Exhausted { attempts: u32 },
}

/// Tracks consecutive failed runs of the child.
///
/// Intentional restarts never go through this type.
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    attempt_count: u32,
    max_attempts: u32,
    delay: Duration,
    last_failure_time: Option<DateTime<Utc>>,
}

impl RestartPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            attempt_count: 0,
            max_attempts,
            delay,
            last_failure_time: None,
        }
    }

    pub fn from_config(settings: &RestartSettings) -> Self {
        Self::new(settings.max_attempts, settings.delay)
    }

    /// Record a failure and decide whether another spawn is permitted
    pub fn on_failure(&mut self) -> RestartDecision {
        self.attempt_count = self.attempt_count.saturating_add(1);
        self.last_failure_time = Some(Utc::now());

        if self.is_exhausted() {
            RestartDecision::Exhausted {
                attempts: self.attempt_count,
            }
        } else {
            RestartDecision::Retry {
                attempt: self.attempt_count,
                delay: self.delay,
            }
        }
    }

    /// Clear the counter after a run that counted as successful
    pub fn reset(&mut self) {
        if self.attempt_count > 0 {
            debug!(previous = self.attempt_count, "Restart attempt counter reset");
        }
        self.attempt_count = 0;
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn last_failure_time(&self) -> Option<DateTime<Utc>> {
        self.last_failure_time
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt_count > self.max_attempts
    }
}
