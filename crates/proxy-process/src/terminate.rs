//! Process termination primitives.

use proxy_common::ProcessResult;

/// Terminate a process gracefully (SIGTERM).
pub fn terminate_gracefully(pid: u32) -> ProcessResult<()> {
    #[cfg(unix)]
    {
        send_signal(pid, nix::sys::signal::Signal::SIGTERM)
    }

    #[cfg(not(unix))]
    {
        Err(proxy_common::ProcessError::unsupported(format!(
            "graceful termination of pid {}",
            pid
        )))
    }
}

/// Force kill a process (SIGKILL).
pub fn force_kill(pid: u32) -> ProcessResult<()> {
    #[cfg(unix)]
    {
        send_signal(pid, nix::sys::signal::Signal::SIGKILL)
    }

    #[cfg(not(unix))]
    {
        Err(proxy_common::ProcessError::unsupported(format!(
            "forced kill of pid {}",
            pid
        )))
    }
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: nix::sys::signal::Signal) -> ProcessResult<()> {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let nix_pid = Pid::from_raw(pid as i32);
    kill(nix_pid, signal).map_err(|e| {
        proxy_common::ProcessError::signal_failed(pid, signal.as_str(), e.to_string())
    })?;
    tracing::debug!(pid, signal = signal.as_str(), "Signal sent");
    Ok(())
}
