//! Maps parsed commands onto the runtime managers.
//!
//! Handlers print their own success lines and return errors untouched; the
//! runner turns any error into the diagnostic report.

use std::fmt;
use std::io::Write;

use corsica_config::Config;
use corsica_runtime::{
    ForegroundExit, LifecycleError, LifecycleManager, PluginManager, Provisioner,
    ServerProcessRecord, ServerStatus, StartMode, StartOutcome, SystemShell, format_timestamp,
};
use tracing::debug;

use crate::AppError;
use crate::cli::{CliCommand, StartArgs};

const COMMANDS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::commands");

/// Line-oriented writer for command results.
pub(crate) struct CommandOutput<'a, W: Write> {
    stdout: &'a mut W,
}

impl<'a, W: Write> CommandOutput<'a, W> {
    pub(crate) const fn new(stdout: &'a mut W) -> Self {
        Self { stdout }
    }

    fn line(&mut self, args: fmt::Arguments<'_>) -> Result<(), AppError> {
        self.stdout.write_fmt(args).map_err(AppError::Output)?;
        self.stdout.write_all(b"\n").map_err(AppError::Output)?;
        self.stdout.flush().map_err(AppError::Output)
    }

    fn done(&mut self) -> Result<(), AppError> {
        self.line(format_args!("Done!"))
    }
}

/// Runs `command` against the configured installation.
pub(crate) fn execute<W: Write>(
    command: &CliCommand,
    config: &Config,
    output: &mut CommandOutput<'_, W>,
) -> Result<(), AppError> {
    debug!(target: COMMANDS_TARGET, command = command.name(), "dispatching command");
    match command {
        CliCommand::Setup => setup(config, output),
        CliCommand::Start(args) => start(config, *args, output, false),
        CliCommand::Restart(args) => start(config, *args, output, true),
        CliCommand::Stop => stop(config, output),
        CliCommand::Status => status(config, output),
        CliCommand::AddPlugin { name } => add_plugin(config, name, output),
        CliCommand::RemovePlugin { name } => remove_plugin(config, name, output),
        CliCommand::ListPlugins => list_plugins(config, output),
        CliCommand::Update => update(config, output),
    }
}

fn setup<W: Write>(config: &Config, output: &mut CommandOutput<'_, W>) -> Result<(), AppError> {
    let provisioner = Provisioner::from_config(config, SystemShell);
    provisioner.setup()?;
    output.line(format_args!(
        "Corsica installed in {}",
        provisioner.install_path().display()
    ))?;
    output.done()
}

fn start<W: Write>(
    config: &Config,
    args: StartArgs,
    output: &mut CommandOutput<'_, W>,
    restart: bool,
) -> Result<(), AppError> {
    let mode = if args.background {
        StartMode::Background
    } else {
        StartMode::Foreground
    };
    let mut manager = LifecycleManager::from_config(config)?;
    let mut notice = Ok(());
    let announce = |_: &ServerProcessRecord| {
        if mode == StartMode::Foreground {
            notice = output.line(format_args!("Press Ctrl+C to exit."));
        }
    };
    let outcome = if restart {
        manager.restart_with(mode, announce)?
    } else {
        manager.launch_with(mode, announce)?
    };
    notice?;

    match outcome {
        StartOutcome::Background(record) => output.line(format_args!(
            "Server running in the background (pid {}); logs in {}",
            record.pid,
            manager.store().paths().log_path().display()
        ))?,
        StartOutcome::Foreground(ForegroundExit::Completed { pid }) => {
            output.line(format_args!("Server (pid {pid}) exited."))?;
        }
        StartOutcome::Foreground(ForegroundExit::Terminated { pid, signal }) => {
            output.line(format_args!(
                "Server (pid {pid}) was terminated by signal {signal}."
            ))?;
        }
        StartOutcome::Foreground(ForegroundExit::Interrupted { pid }) => {
            output.line(format_args!("Server (pid {pid}) stopped."))?;
        }
    }
    output.done()
}

fn stop<W: Write>(config: &Config, output: &mut CommandOutput<'_, W>) -> Result<(), AppError> {
    let mut manager = LifecycleManager::from_config(config)?;
    match manager.stop() {
        Ok(record) => {
            output.line(format_args!("Server (pid {}) stopped.", record.pid))?;
            output.done()
        }
        Err(LifecycleError::NotRunning) => {
            output.line(format_args!("The server is not running."))
        }
        Err(error) => Err(error.into()),
    }
}

fn status<W: Write>(config: &Config, output: &mut CommandOutput<'_, W>) -> Result<(), AppError> {
    let mut manager = LifecycleManager::from_config(config)?;
    match manager.status()? {
        ServerStatus::Running(record) => output.line(format_args!(
            "The server is running (pid {}, {}, started {}).",
            record.pid,
            attachment(&record),
            format_timestamp(record.started_at)
        )),
        ServerStatus::Stopped => output.line(format_args!("The server is not running.")),
    }
}

const fn attachment(record: &ServerProcessRecord) -> &'static str {
    if record.backgrounded {
        "background"
    } else {
        "foreground"
    }
}

fn add_plugin<W: Write>(
    config: &Config,
    name: &str,
    output: &mut CommandOutput<'_, W>,
) -> Result<(), AppError> {
    let record = PluginManager::from_config(config, SystemShell)?.install(name)?;
    output.line(format_args!(
        "Installed plugin {} into {}",
        record.name,
        record.install_path.display()
    ))?;
    output.line(format_args!(
        "Run 'corsica restart' for the change to take effect."
    ))?;
    output.done()
}

fn remove_plugin<W: Write>(
    config: &Config,
    name: &str,
    output: &mut CommandOutput<'_, W>,
) -> Result<(), AppError> {
    let record = PluginManager::from_config(config, SystemShell)?.remove(name)?;
    output.line(format_args!("Removed plugin {}", record.name))?;
    output.line(format_args!(
        "Run 'corsica restart' for the change to take effect."
    ))?;
    output.done()
}

fn list_plugins<W: Write>(
    config: &Config,
    output: &mut CommandOutput<'_, W>,
) -> Result<(), AppError> {
    let mut plugins = PluginManager::from_config(config, SystemShell)?
        .list()?
        .peekable();
    if plugins.peek().is_none() {
        return output.line(format_args!("No plugins installed."));
    }
    for plugin in plugins {
        output.line(format_args!(
            "{}\t{}",
            plugin.name,
            format_timestamp(plugin.installed_at)
        ))?;
    }
    Ok(())
}

fn update<W: Write>(config: &Config, output: &mut CommandOutput<'_, W>) -> Result<(), AppError> {
    Provisioner::from_config(config, SystemShell).update()?;
    output.done()
}
