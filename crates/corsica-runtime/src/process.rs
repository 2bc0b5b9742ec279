//! Liveness probes and signal delivery for server processes.
//!
//! A backgrounded server leads its own process group, so its liveness and
//! termination address the whole group: package-manager launchers such as
//! `npx` fork the real server as a child, and signalling only the leader
//! would orphan it.
//!
//! An exited child of this process lingers as a zombie that still answers
//! `kill(2)`, so liveness probes reap such children first.

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill, killpg};
use nix::sys::wait::{WaitPidFlag, waitpid};
use nix::unistd::Pid;
use thiserror::Error;

/// Whether a signal addresses a single process or the group it leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalTarget {
    /// Only the process itself.
    Process,
    /// Every member of the process group led by the process.
    Group,
}

impl SignalTarget {
    /// Group targeting for detached servers, process targeting otherwise.
    #[must_use]
    pub const fn for_server(backgrounded: bool) -> Self {
        if backgrounded {
            Self::Group
        } else {
            Self::Process
        }
    }
}

/// Errors raised while probing or signalling a process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The identifier cannot name a single process or group.
    #[error("pid {pid} is not a valid process identifier")]
    InvalidPid {
        /// Rejected identifier.
        pid: u32,
    },
    /// The kernel refused the liveness probe for a reason other than absence.
    #[error("failed to probe pid {pid}: {source}")]
    Probe {
        /// Probed identifier.
        pid: u32,
        /// Errno reported by `kill(2)`.
        #[source]
        source: Errno,
    },
    /// Delivering a signal failed for a reason other than absence.
    #[error("failed to send {signal} to pid {pid}: {source}")]
    Signal {
        /// Signalled identifier.
        pid: u32,
        /// Signal that could not be delivered.
        signal: Signal,
        /// Errno reported by `kill(2)`.
        #[source]
        source: Errno,
    },
}

fn to_pid(pid: u32) -> Result<Pid, ProcessError> {
    match i32::try_from(pid) {
        Ok(raw) if raw > 0 => Ok(Pid::from_raw(raw)),
        _ => Err(ProcessError::InvalidPid { pid }),
    }
}

fn deliver(pid: Pid, target: SignalTarget, signal: Option<Signal>) -> nix::Result<()> {
    match target {
        SignalTarget::Process => kill(pid, signal),
        SignalTarget::Group => killpg(pid, signal),
    }
}

/// Reports whether the process (or group) still exists.
///
/// `EPERM` means the process exists under another user and counts as alive.
/// When `pid` is an exited child of the calling process it is reaped first and
/// reported dead.
///
/// # Errors
///
/// Returns [`ProcessError::InvalidPid`] for identifiers `kill(2)` would
/// interpret as broadcasts, and [`ProcessError::Probe`] for unexpected errno
/// values.
pub fn is_alive(pid: u32, target: SignalTarget) -> Result<bool, ProcessError> {
    let raw = to_pid(pid)?;
    reap_exited_child(raw, pid)?;
    match deliver(raw, target, None) {
        Ok(()) | Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(source) => Err(ProcessError::Probe { pid, source }),
    }
}

fn reap_exited_child(raw: Pid, pid: u32) -> Result<(), ProcessError> {
    match waitpid(raw, Some(WaitPidFlag::WNOHANG)) {
        Ok(_) | Err(Errno::ECHILD) => Ok(()),
        Err(source) => Err(ProcessError::Probe { pid, source }),
    }
}

/// Sends `signal`, returning `false` when the target no longer exists.
///
/// # Errors
///
/// Returns [`ProcessError::InvalidPid`] or [`ProcessError::Signal`].
pub fn send_signal(pid: u32, target: SignalTarget, signal: Signal) -> Result<bool, ProcessError> {
    let raw = to_pid(pid)?;
    match deliver(raw, target, Some(signal)) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(source) => Err(ProcessError::Signal {
            pid,
            signal,
            source,
        }),
    }
}
