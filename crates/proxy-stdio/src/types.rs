//! Core types for the stdio bridge

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the three standard streams
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Stdin,
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::Stdin => write!(f, "stdin"),
            StreamType::Stdout => write!(f, "stdout"),
            StreamType::Stderr => write!(f, "stderr"),
        }
    }
}

/// Point-in-time view of the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeStatus {
    /// Generation of the child currently receiving stdin, if any
    pub attached_generation: Option<u64>,
    /// Supervisor stdin reached EOF
    pub input_closed: bool,
    pub stdin_bytes: u64,
    pub stdout_bytes: u64,
    pub stderr_bytes: u64,
    pub last_activity: Option<DateTime<Utc>>,
}
