//! Runs external programs such as the package manager.
//!
//! [`ShellExecutor`] is the seam the plugin manager and provisioner depend
//! on; tests substitute a fake while [`SystemShell`] spawns real processes.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

const SHELL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::shell");

/// A program invocation with its arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl ShellCommand {
    /// Starts building an invocation of `program`.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Runs the program from `dir` instead of the caller's directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Program to execute.
    #[must_use]
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments passed to the program.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Working directory, when overridden.
    #[must_use]
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Captured result of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    /// Exit code reported by the program.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Errors raised while running an external program.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The program could not be launched.
    #[error("failed to run '{command}': {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The program ran but reported failure.
    #[error("'{command}' exited with {}: {}", describe_status(*exit_code), stderr.trim())]
    NonZeroExit {
        /// Rendered command line.
        command: String,
        /// Exit code, absent when terminated by a signal.
        exit_code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
}

fn describe_status(exit_code: Option<i32>) -> String {
    exit_code.map_or_else(|| "a signal".to_owned(), |code| format!("status {code}"))
}

/// Executes shell commands on behalf of the CLI.
pub trait ShellExecutor {
    /// Runs `command` to completion, failing on a non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Spawn`] when the program cannot start and
    /// [`ExecError::NonZeroExit`] when it reports failure.
    fn run(&self, command: &ShellCommand) -> Result<ShellOutput, ExecError>;
}

/// [`ShellExecutor`] backed by [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShell;

impl ShellExecutor for SystemShell {
    fn run(&self, command: &ShellCommand) -> Result<ShellOutput, ExecError> {
        let rendered = command.to_string();
        let mut process = Command::new(command.program());
        process.args(command.args()).stdin(Stdio::null());
        if let Some(dir) = command.cwd() {
            process.current_dir(dir);
        }
        debug!(target: SHELL_TARGET, command = %rendered, cwd = ?command.cwd(), "running command");

        let output = process.output().map_err(|source| ExecError::Spawn {
            command: rendered.clone(),
            source,
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(ExecError::NonZeroExit {
                command: rendered,
                exit_code: output.status.code(),
                stderr,
            });
        }
        debug!(target: SHELL_TARGET, command = %rendered, "command succeeded");
        Ok(ShellOutput {
            exit_code: output.status.code().unwrap_or_default(),
            stdout,
            stderr,
        })
    }
}
