//! Derives runtime artefact paths shared by the lifecycle and plugin managers.
//!
//! Everything the CLI persists between invocations lives under
//! `<install_path>/.corsica/`: the runtime state document, the advisory lock
//! guarding it, and the log of a backgrounded server. Both managers agree on
//! this layout so a `stop` issued from a fresh terminal finds the server that
//! an earlier `start --background` recorded.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

const STATE_DIRECTORY: &str = ".corsica";

/// Canonical paths for runtime artefacts under the install path.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    install_path: PathBuf,
    state_dir: PathBuf,
    state_path: PathBuf,
    lock_path: PathBuf,
    log_path: PathBuf,
    plugins_dir: PathBuf,
}

impl RuntimePaths {
    /// Derives runtime paths from the shared configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimePathsError::MissingInstallPath`] when the install path
    /// has not been provisioned, and [`RuntimePathsError::StateDirectory`] when
    /// the state directory cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, RuntimePathsError> {
        let install_path = config.install_path().into_std_path_buf();
        if !install_path.is_dir() {
            return Err(RuntimePathsError::MissingInstallPath { path: install_path });
        }
        let state_dir = install_path.join(STATE_DIRECTORY);
        fs::create_dir_all(&state_dir).map_err(|source| RuntimePathsError::StateDirectory {
            path: state_dir.clone(),
            source,
        })?;
        Ok(Self {
            state_path: state_dir.join("state.json"),
            lock_path: state_dir.join("state.lock"),
            log_path: state_dir.join("server.log"),
            plugins_dir: config.plugins_dir().into_std_path_buf(),
            state_dir,
            install_path,
        })
    }

    /// Root directory of the installation.
    #[must_use]
    pub fn install_path(&self) -> &Path {
        self.install_path.as_path()
    }

    /// Directory holding runtime artefacts.
    #[must_use]
    pub fn state_dir(&self) -> &Path {
        self.state_dir.as_path()
    }

    /// Path to the persisted runtime state document.
    #[must_use]
    pub fn state_path(&self) -> &Path {
        self.state_path.as_path()
    }

    /// Path to the advisory lock guarding state updates.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        self.lock_path.as_path()
    }

    /// Path receiving stdout and stderr of a backgrounded server.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        self.log_path.as_path()
    }

    /// Directory plugin packages are installed into.
    #[must_use]
    pub fn plugins_dir(&self) -> &Path {
        self.plugins_dir.as_path()
    }
}

/// Errors raised while deriving runtime paths.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// The install path does not exist yet.
    #[error("install path '{}' does not exist; run 'corsica setup' first", path.display())]
    MissingInstallPath {
        /// Configured install path.
        path: PathBuf,
    },
    /// Creating the state directory failed.
    #[error("failed to prepare state directory '{}': {source}", path.display())]
    StateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
