//! Process existence checking.

use proxy_common::ProcessResult;

/// Check if a process with the given PID exists.
///
/// Uses `kill(pid, 0)`: no signal is delivered, only the lookup is performed.
/// A zombie (exited but not yet reaped) still counts as existing.
///
/// * `Ok(true)` - Process exists (possibly owned by another user)
/// * `Ok(false)` - No such process
/// * `Err(_)` - The check itself failed
pub fn process_exists(pid: u32) -> ProcessResult<bool> {
    #[cfg(unix)]
    {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), None) {
            Ok(_) => Ok(true),
            Err(nix::errno::Errno::ESRCH) => Ok(false),
            Err(nix::errno::Errno::EPERM) => Ok(true),
            Err(e) => Err(proxy_common::ProcessError::check_failed(pid, e.to_string())),
        }
    }

    #[cfg(not(unix))]
    {
        Err(proxy_common::ProcessError::unsupported(format!(
            "existence check of pid {}",
            pid
        )))
    }
}
