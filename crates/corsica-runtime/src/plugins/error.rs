//! Domain errors raised by plugin operations.

use std::io;
use std::path::PathBuf;

use corsica_config::RuntimePathsError;
use thiserror::Error;

use crate::shell::ExecError;
use crate::state::StateError;

/// Errors arising from plugin installation, removal, or listing.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The name cannot identify a package safely.
    #[error("'{name}' is not a valid plugin name: {reason}")]
    InvalidName {
        /// Rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A plugin with this name is already recorded.
    #[error("plugin '{name}' is already installed")]
    AlreadyInstalled {
        /// Plugin name.
        name: String,
    },

    /// No plugin with this name is recorded.
    #[error("plugin '{name}' is not installed")]
    NotInstalled {
        /// Plugin name.
        name: String,
    },

    /// The package manager failed to install the plugin.
    #[error("failed to install plugin '{name}': {source}")]
    Install {
        /// Plugin name.
        name: String,
        /// Package manager failure.
        #[source]
        source: ExecError,
    },

    /// The plugin's files could not be deleted.
    #[error("failed to remove plugin '{name}' from '{}': {source}", path.display())]
    Remove {
        /// Plugin name.
        name: String,
        /// Directory that could not be deleted.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The plugin directory could not be created.
    #[error("failed to prepare plugin directory '{}': {source}", path.display())]
    PluginsDirectory {
        /// Plugin directory.
        path: PathBuf,
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
}
