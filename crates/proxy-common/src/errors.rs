//! Error types shared by the proxy crates.
//!
//! Library crates return `Result<T>` / `ProcessResult<T>` and let the
//! binary wrap them in `anyhow` at the edge. Each variant carries enough
//! context (pid, command, signal) to make a single log line useful.

use thiserror::Error;

/// Result type alias for proxy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the supervisor.
#[derive(Debug, Error)]
pub enum Error {
    /// Failure in a process primitive.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Signal handler registration failed.
    #[error("Signal handler error: {0}")]
    Signal(String),

    /// Internal error (shouldn't happen in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error with context.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        source: Box<Error>,
    },
}

impl Error {
    pub fn signal(message: impl Into<String>) -> Self {
        Self::Signal(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Adds context to an error.
    ///
    /// # Example
    /// ```
    /// use proxy_common::{Error, Result};
    ///
    /// fn inner() -> Result<()> {
    ///     Err(Error::internal("event queue closed"))
    /// }
    ///
    /// fn outer() -> Result<()> {
    ///     inner().map_err(|e| e.context("Failed to start supervisor"))
    /// }
    /// ```
    pub fn context(self, message: impl Into<String>) -> Self {
        Self::WithContext {
            message: message.into(),
            source: Box::new(self),
        }
    }
}

// Convenience methods for Result types
pub trait ResultExt<T> {
    /// Adds context to an error result.
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(message))
    }
}

// ==============================================================================
// Process Errors
// ==============================================================================

/// Errors raised by the process primitives and the child lifecycle.
#[derive(Error, Debug, Clone)]
pub enum ProcessError {
    #[error("Process spawn failed: {command} - {reason}")]
    SpawnFailed { command: String, reason: String },

    #[error("Failed to send {signal} to pid {pid}: {reason}")]
    SignalFailed {
        pid: u32,
        signal: String,
        reason: String,
    },

    #[error("Failed to check pid {pid}: {reason}")]
    CheckFailed { pid: u32, reason: String },

    #[error("Process wait failed: pid {pid:?} - {reason}")]
    WaitFailed { pid: Option<u32>, reason: String },

    #[error("Invalid state transition for {id}: expected {expected}, got {actual}")]
    InvalidState {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("Operation not supported on this platform: {operation}")]
    Unsupported { operation: String },
}

impl ProcessError {
    pub fn spawn_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }

    pub fn signal_failed(pid: u32, signal: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SignalFailed {
            pid,
            signal: signal.into(),
            reason: reason.into(),
        }
    }

    pub fn check_failed(pid: u32, reason: impl Into<String>) -> Self {
        Self::CheckFailed {
            pid,
            reason: reason.into(),
        }
    }

    pub fn wait_failed(pid: Option<u32>, reason: impl Into<String>) -> Self {
        Self::WaitFailed {
            pid,
            reason: reason.into(),
        }
    }

    pub fn invalid_state(
        id: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            id: id.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }
}

/// Result type for process operations.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;
