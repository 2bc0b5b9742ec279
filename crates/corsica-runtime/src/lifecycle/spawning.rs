//! Server process spawning.
//!
//! Foreground servers share the CLI's terminal. Background servers are
//! detached into a new session, which also makes them leaders of their own
//! process group, with output appended to the runtime log.

use std::fs::{File, OpenOptions};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Stdio};

use super::command::ServerCommand;
use super::error::LifecycleError;

/// Launches the server attached to the CLI's standard streams.
pub(super) fn spawn_foreground(
    server: &ServerCommand,
    cwd: &Path,
) -> Result<Child, LifecycleError> {
    let mut command = server.to_command(cwd);
    command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    command.spawn().map_err(|source| LifecycleError::Spawn {
        program: server.program().to_owned(),
        source,
    })
}

/// Launches the server in its own session, logging to `log_path`.
pub(super) fn spawn_detached(
    server: &ServerCommand,
    cwd: &Path,
    log_path: &Path,
) -> Result<Child, LifecycleError> {
    let stdout = open_log(log_path)?;
    let stderr = stdout.try_clone().map_err(|source| LifecycleError::OpenLog {
        path: log_path.to_path_buf(),
        source,
    })?;

    let mut command = server.to_command(cwd);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    // SAFETY: `setsid(2)` is async-signal-safe and touches no memory shared
    // with the parent, so it is sound to call between fork and exec.
    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid()
                .map(drop)
                .map_err(std::io::Error::from)
        });
    }
    command.spawn().map_err(|source| LifecycleError::Spawn {
        program: server.program().to_owned(),
        source,
    })
}

fn open_log(path: &Path) -> Result<File, LifecycleError> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path).map_err(|source| LifecycleError::OpenLog {
        path: path.to_path_buf(),
        source,
    })
}
