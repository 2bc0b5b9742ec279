//! Server lifecycle management.
//!
//! [`LifecycleManager`] launches the server in the foreground (blocking until
//! it exits or the user interrupts) or detached in the background (returning
//! once a [`ReadinessProbe`] reports ready), and stops it with `SIGTERM`
//! followed by `SIGKILL` after a grace period. Every transition is recorded in
//! the runtime state so later invocations can find, stop, or report on the
//! server.

use std::fmt;
use std::time::Duration;

use corsica_config::Config;

use crate::state::ServerProcessRecord;

mod command;
mod error;
mod interrupts;
mod manager;
mod readiness;
mod spawning;

pub use command::ServerCommand;
pub use error::LifecycleError;
pub use interrupts::{InterruptSignal, SystemInterrupts};
pub use manager::LifecycleManager;
pub use readiness::{ReadinessProbe, TcpPortProbe};

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Time allowed for the server to exit after `SIGKILL`.
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between liveness and readiness polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a start request attaches the server to the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Share the terminal and block until the server exits.
    Foreground,
    /// Detach and return once the server is ready.
    Background,
}

/// Lifecycle state of the server as observed by one manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServerState {
    /// No server is running.
    #[default]
    Stopped,
    /// A launch is in progress.
    Starting,
    /// The server is running.
    Running,
    /// A termination request is in progress.
    Stopping,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
        }
    }
}

/// Result of a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    /// A live server is recorded.
    Running(ServerProcessRecord),
    /// No live server is recorded.
    Stopped,
}

/// How a foreground server came to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForegroundExit {
    /// The server exited successfully on its own.
    Completed {
        /// Server pid.
        pid: u32,
    },
    /// The server was terminated by a signal sent from elsewhere.
    Terminated {
        /// Server pid.
        pid: u32,
        /// Terminating signal number.
        signal: i32,
    },
    /// The user interrupted the CLI and the server was stopped.
    Interrupted {
        /// Server pid.
        pid: u32,
    },
}

/// Outcome of [`LifecycleManager::launch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A foreground server ran to completion.
    Foreground(ForegroundExit),
    /// A background server is running and ready.
    Background(ServerProcessRecord),
}

/// Time budgets governing starts and stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleTimings {
    /// Wait for a background server to become ready.
    pub readiness_timeout: Duration,
    /// Wait between `SIGTERM` and `SIGKILL`.
    pub stop_grace: Duration,
    /// Wait after `SIGKILL` before reporting failure.
    pub kill_timeout: Duration,
    /// Delay between polls.
    pub poll_interval: Duration,
}

impl LifecycleTimings {
    /// Takes the readiness and grace budgets from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            readiness_timeout: config.readiness_timeout(),
            stop_grace: config.stop_grace(),
            ..Self::default()
        }
    }
}

impl Default for LifecycleTimings {
    fn default() -> Self {
        Self {
            readiness_timeout: corsica_config::DEFAULT_READINESS_TIMEOUT,
            stop_grace: corsica_config::DEFAULT_STOP_GRACE,
            kill_timeout: DEFAULT_KILL_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
