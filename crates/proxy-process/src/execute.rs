//! Process execution primitives.

use proxy_common::{ProcessError, ProcessResult};
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

/// Spawn `executable` with `args`, piping stdin, stdout and stderr.
///
/// The child is placed in its own process group so a terminal Ctrl-C is
/// delivered to the supervisor only; the supervisor then decides how the
/// child is stopped. Dropping the returned [`Child`] does not kill it.
pub fn spawn_piped(
    executable: &str,
    args: &[String],
    working_directory: Option<&Path>,
) -> ProcessResult<Child> {
    let mut cmd = Command::new(executable);
    cmd.args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false);

    if let Some(dir) = working_directory {
        cmd.current_dir(dir);
    }

    #[cfg(unix)]
    {
        cmd.process_group(0);
    }

    #[cfg(windows)]
    {
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x00000200;
        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }

    let child = cmd
        .spawn()
        .map_err(|e| ProcessError::spawn_failed(executable, e.to_string()))?;

    debug!(pid = ?child.id(), executable, "Spawned piped child process");
    Ok(child)
}
