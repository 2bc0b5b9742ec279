//! Command-line controller for a local Corsica server and its plugins.
//!
//! The runner splits configuration flags from the command, loads layered
//! configuration, installs telemetry, and dispatches to the runtime managers
//! in `corsica-runtime`. Every failure is rendered once, at this boundary, as
//! a diagnostic report carrying the CLI version and the command line so bug
//! reports are actionable. Configuration loading is injected so tests can run
//! the whole pipeline against a sandboxed installation.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};

mod cli;
mod commands;
mod config;
mod errors;
mod report;
mod telemetry;

use cli::Cli;
use commands::CommandOutput;
use config::{command_arguments, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;

/// CLI flags recognised by the configuration loader.
///
/// Keep in sync with the fields of `corsica_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--install-path",
    "--server-command",
    "--server-port",
    "--plugins-dir",
    "--package-manager",
    "--server-package",
    "--readiness-timeout-ms",
    "--stop-grace-ms",
    "--log-filter",
    "--log-format",
];

const CLI_TARGET: &str = env!("CARGO_PKG_NAME");

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    stdout: &'a mut W,
    stderr: &'a mut E,
    loader: &'a L,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    const fn new(stdout: &'a mut W, stderr: &'a mut E, loader: &'a L) -> Self {
        Self {
            stdout,
            stderr,
            loader,
        }
    }

    fn run(&mut self, args: &[OsString]) -> ExitCode {
        match self.execute(args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(AppError::CliUsage(error)) => self.usage(&error),
            Err(error) => {
                if let Err(write_error) = report::write_report(&mut *self.stderr, &error, args) {
                    tracing::error!(
                        target: CLI_TARGET,
                        %error,
                        %write_error,
                        "failed to write diagnostic report"
                    );
                }
                ExitCode::FAILURE
            }
        }
    }

    fn execute(&mut self, args: &[OsString]) -> Result<(), AppError> {
        let split = split_config_arguments(args);
        let cli = Cli::try_parse_from(command_arguments(args, &split)).map_err(AppError::CliUsage)?;
        let Some(command) = cli.command else {
            return self.write_bare_help();
        };

        let config = self.loader.load(&split.config_arguments)?;
        telemetry::initialise(&config)?;
        commands::execute(&command, &config, &mut CommandOutput::new(&mut *self.stdout))
    }

    /// A bare `corsica` is a request for help, not a usage error.
    fn write_bare_help(&mut self) -> Result<(), AppError> {
        let help = Cli::command().render_help();
        writeln!(self.stdout, "{help}").map_err(AppError::Output)
    }

    /// Help and version requests succeed; genuine usage errors do not.
    fn usage(&mut self, error: &clap::Error) -> ExitCode {
        let rendered = error.render();
        let (written, code) = if error.use_stderr() {
            (write!(self.stderr, "{rendered}"), error.exit_code())
        } else {
            (write!(self.stdout, "{rendered}"), 0)
        };
        match (written, u8::try_from(code)) {
            (Ok(()), Ok(status)) => ExitCode::from(status),
            _ => ExitCode::FAILURE,
        }
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    CliRunner::new(stdout, stderr, loader).run(&arguments)
}

#[cfg(test)]
mod tests;
