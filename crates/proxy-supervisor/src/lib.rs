//! # Proxy Supervisor
//!
//! Keeps one child process running behind the proxy's own stdio:
//! - crash restarts under a bounded-attempt, fixed-delay policy
//! - restarts when watched build artifacts change
//! - SIGTERM-then-SIGKILL shutdown on SIGINT/SIGTERM
//!
//! ```no_run
//! use proxy_supervisor::{ProcessSupervisor, SupervisorConfig};
//!
//! # async fn run() -> anyhow::Result<i32> {
//! let mut config = SupervisorConfig::default();
//! config.apply_env_overrides();
//!
//! let handle = ProcessSupervisor::new(config).start().await?;
//! let report = handle.wait().await?;
//! Ok(report.exit_code())
//! # }
//! ```

pub mod config;
pub mod lifecycle;
pub mod signals;
pub mod supervisor;

pub use config::{ArtifactSource, SupervisorConfig};
pub use lifecycle::{RestartDecision, RestartPolicy};
pub use signals::ShutdownSignals;
pub use supervisor::{
    ProcessSupervisor, ShutdownSource, SupervisorHandle, SupervisorOutcome, SupervisorReport,
    SupervisorStatus,
};

pub use proxy_process_state::{StateTransition, SupervisorState};
pub use proxy_stdio::StdioEndpoints;
