//! CLI argument definitions for the Corsica controller.

use clap::{Args, Parser, Subcommand};

/// Command-line interface for managing a local Corsica server.
#[derive(Parser, Debug)]
#[command(
    name = "corsica",
    version,
    about = "Manage a local Corsica server and its plugins",
    disable_help_subcommand = true
)]
pub(crate) struct Cli {
    /// Command to run.
    #[command(subcommand)]
    pub(crate) command: Option<CliCommand>,
}

/// Commands understood by the controller.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Creates the installation and installs the server package.
    Setup,
    /// Starts the server.
    Start(StartArgs),
    /// Stops any running server, then starts it again.
    Restart(StartArgs),
    /// Stops the running server.
    Stop,
    /// Reports whether the server is running.
    Status,
    /// Installs a plugin.
    AddPlugin {
        /// Package name of the plugin.
        name: String,
    },
    /// Removes an installed plugin.
    RemovePlugin {
        /// Package name of the plugin.
        name: String,
    },
    /// Lists installed plugins.
    ListPlugins,
    /// Updates the server package and installed plugins.
    Update,
}

/// Options shared by `start` and `restart`.
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StartArgs {
    /// Detaches the server and returns once it accepts connections.
    #[arg(short, long)]
    pub(crate) background: bool,
}

impl CliCommand {
    /// Subcommand name as typed by the operator.
    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Start(_) => "start",
            Self::Restart(_) => "restart",
            Self::Stop => "stop",
            Self::Status => "status",
            Self::AddPlugin { .. } => "add-plugin",
            Self::RemovePlugin { .. } => "remove-plugin",
            Self::ListPlugins => "list-plugins",
            Self::Update => "update",
        }
    }
}
