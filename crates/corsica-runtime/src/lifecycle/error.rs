//! Error types for server lifecycle operations.

use std::io;
use std::path::PathBuf;

use corsica_config::RuntimePathsError;
use thiserror::Error;

use crate::process::ProcessError;
use crate::state::StateError;

/// Errors raised while starting, stopping, or inspecting the server.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A live server is already recorded.
    #[error("the server is already running (pid {pid}); stop it first or use 'corsica restart'")]
    AlreadyRunning {
        /// Recorded server pid.
        pid: u32,
    },
    /// No live server is recorded.
    #[error("the server is not running")]
    NotRunning,
    /// The configured launch command has no program.
    #[error("the server command is empty; set server_command in the configuration")]
    EmptyServerCommand,
    /// Launching the server process failed.
    #[error("failed to launch server '{program}': {source}")]
    Spawn {
        /// Program that could not be launched.
        program: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Opening the background log failed.
    #[error("failed to open server log '{}': {source}", path.display())]
    OpenLog {
        /// Log file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A background server exited before becoming ready.
    #[error(
        "server pid {pid} exited before becoming ready (status: {exit_status:?}); see {}",
        log_path.display()
    )]
    ExitedEarly {
        /// Server pid.
        pid: u32,
        /// Exit code, absent when terminated by a signal.
        exit_status: Option<i32>,
        /// Log capturing the server's output.
        log_path: PathBuf,
    },
    /// A background server did not become ready in time.
    #[error("server pid {pid} did not become ready within {timeout_ms} ms ({probe})")]
    ReadinessTimeout {
        /// Server pid, still recorded as running.
        pid: u32,
        /// Readiness budget.
        timeout_ms: u64,
        /// Description of the readiness check.
        probe: String,
    },
    /// The readiness probe failed outright.
    #[error("readiness probe {probe} failed: {source}")]
    Probe {
        /// Description of the readiness check.
        probe: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A foreground server exited unsuccessfully on its own.
    #[error("server pid {pid} exited with status {exit_status:?}")]
    ServerFailed {
        /// Server pid.
        pid: u32,
        /// Exit code, absent when terminated by a signal.
        exit_status: Option<i32>,
    },
    /// The server survived both the termination request and the forced kill.
    #[error("server pid {pid} did not exit after SIGTERM and SIGKILL ({waited_ms} ms)")]
    StopFailed {
        /// Server pid, still recorded as running.
        pid: u32,
        /// Total time spent waiting for exit.
        waited_ms: u64,
    },
    /// Polling a spawned child failed.
    #[error("failed to monitor server process: {source}")]
    MonitorChild {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Installing interrupt handlers failed.
    #[error("failed to install interrupt handlers: {source}")]
    Interrupts {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Runtime paths could not be derived.
    #[error(transparent)]
    Paths(#[from] RuntimePathsError),
    /// Runtime state could not be read or written.
    #[error(transparent)]
    State(#[from] StateError),
    /// A liveness probe or signal failed.
    #[error(transparent)]
    Process(#[from] ProcessError),
}
