//! Shared configuration for the Corsica command-line controller.
//!
//! A single [`Config`] carries both the CLI install settings (where the server
//! and its plugins live, which package manager provisions them) and the server
//! runtime parameters consumed by the lifecycle manager (launch command,
//! listening port, readiness and shutdown budgets). Values are layered by
//! `ortho_config`: built-in defaults, then configuration files, then
//! `CORSICA_*` environment variables, then command-line flags.
//!
//! Every field is optional on the wire; accessors apply the defaults from
//! [`defaults`] so callers never handle absent values.

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub mod defaults;
mod logging;
mod runtime;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_PACKAGE_MANAGER, DEFAULT_PLUGINS_DIR, DEFAULT_READINESS_TIMEOUT,
    DEFAULT_SERVER_COMMAND, DEFAULT_SERVER_PACKAGE, DEFAULT_SERVER_PORT, DEFAULT_STOP_GRACE,
    default_install_path, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use runtime::{RuntimePaths, RuntimePathsError};

/// Layered configuration for the Corsica CLI and the server it manages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CORSICA")]
pub struct Config {
    /// Root directory holding the server installation, plugins, and runtime state.
    pub install_path: Option<Utf8PathBuf>,
    /// Program and arguments used to launch the server, separated by whitespace.
    pub server_command: Option<String>,
    /// Port the server listens on once it is ready.
    pub server_port: Option<u16>,
    /// Plugin directory, resolved relative to the install path when not absolute.
    pub plugins_dir: Option<Utf8PathBuf>,
    /// Package manager used to provision the server and its plugins.
    pub package_manager: Option<String>,
    /// Package installed into the install path by `corsica setup`.
    pub server_package: Option<String>,
    /// Milliseconds to wait for a backgrounded server to accept connections.
    pub readiness_timeout_ms: Option<u64>,
    /// Milliseconds granted to a server between `SIGTERM` and `SIGKILL`.
    pub stop_grace_ms: Option<u64>,
    /// `tracing` filter directive applied to CLI diagnostics.
    pub log_filter: Option<String>,
    /// Output format for CLI diagnostics.
    pub log_format: Option<LogFormat>,
}

impl Config {
    /// Root directory of the installation.
    #[must_use]
    pub fn install_path(&self) -> Utf8PathBuf {
        self.install_path.clone().unwrap_or_else(default_install_path)
    }

    /// Launch command for the server, as configured.
    #[must_use]
    pub fn server_command(&self) -> &str {
        self.server_command
            .as_deref()
            .unwrap_or(DEFAULT_SERVER_COMMAND)
    }

    /// Port probed for readiness after a background start.
    #[must_use]
    pub fn server_port(&self) -> u16 {
        self.server_port.unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Absolute plugin directory derived from the install path.
    #[must_use]
    pub fn plugins_dir(&self) -> Utf8PathBuf {
        let configured = self
            .plugins_dir
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_PLUGINS_DIR));
        if configured.is_absolute() {
            configured
        } else {
            self.install_path().join(configured)
        }
    }

    /// Package manager executable.
    #[must_use]
    pub fn package_manager(&self) -> &str {
        self.package_manager
            .as_deref()
            .unwrap_or(DEFAULT_PACKAGE_MANAGER)
    }

    /// Server package provisioned by `setup`.
    #[must_use]
    pub fn server_package(&self) -> &str {
        self.server_package
            .as_deref()
            .unwrap_or(DEFAULT_SERVER_PACKAGE)
    }

    /// Readiness budget for background starts.
    #[must_use]
    pub fn readiness_timeout(&self) -> Duration {
        self.readiness_timeout_ms
            .map_or(DEFAULT_READINESS_TIMEOUT, Duration::from_millis)
    }

    /// Grace period between the termination request and a forced kill.
    #[must_use]
    pub fn stop_grace(&self) -> Duration {
        self.stop_grace_ms
            .map_or(DEFAULT_STOP_GRACE, Duration::from_millis)
    }

    /// Log filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }
}
