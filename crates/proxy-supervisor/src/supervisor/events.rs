//! Events consumed by the supervisor actor

use super::types::ShutdownSource;
use proxy_common::ProcessError;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Everything the actor reacts to arrives as one of these.
///
/// Child and timer events carry the generation they were created for; the
/// actor drops them when that generation is no longer current.
#[derive(Debug)]
pub(crate) enum SupervisorEvent {
    /// The child was reaped
    ChildExited { generation: u64, status: ExitStatus },
    /// Waiting on the child failed; it is treated as gone
    ChildError { generation: u64, error: ProcessError },
    /// The crash restart delay elapsed
    RestartDue,
    /// The grace window after SIGTERM (or the confirmation window after SIGKILL) elapsed
    GraceExpired { generation: u64 },
    /// The child stayed up long enough to clear the attempt counter
    AttemptsStable { generation: u64 },
    /// A watched file changed
    FileChanged { path: PathBuf },
    ShutdownRequested { source: ShutdownSource },
}
