//! Runtime services for the Corsica command-line controller.
//!
//! The crate owns everything that survives between CLI invocations or touches
//! the operating system on the CLI's behalf:
//!
//! - [`state`] persists the runtime state document under an advisory lock so
//!   concurrent invocations never interleave their updates.
//! - [`shell`] runs external programs such as the package manager.
//! - [`process`] probes liveness and delivers signals.
//! - [`lifecycle`] starts, stops, and restarts the server process.
//! - [`plugins`] installs, removes, and lists plugins.
//! - [`provision`] prepares and updates the installation.

pub mod lifecycle;
pub mod plugins;
pub mod process;
pub mod provision;
pub mod shell;
pub mod state;

pub use lifecycle::{
    ForegroundExit, LifecycleError, LifecycleManager, LifecycleTimings, ReadinessProbe,
    ServerCommand, ServerState, ServerStatus, StartMode, StartOutcome, TcpPortProbe,
};
pub use plugins::{PluginError, PluginList, PluginManager, PluginSummary, validate_plugin_name};
pub use process::ProcessError;
pub use provision::{ProvisionError, Provisioner};
pub use shell::{ExecError, ShellCommand, ShellExecutor, ShellOutput, SystemShell};
pub use state::{
    PluginRecord, RuntimeState, ServerProcessRecord, StateError, StateGuard, StateStore,
    format_timestamp,
};

#[cfg(test)]
mod tests;
