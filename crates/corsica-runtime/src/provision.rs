//! Installation provisioning: `setup` and `update`.
//!
//! Package manager invocations always pass `--prefix`, so npm never walks up
//! to an unrelated `package.json` in a parent directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use corsica_config::Config;
use thiserror::Error;
use tracing::info;

use crate::shell::{ExecError, ShellCommand, ShellExecutor};

const PROVISION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::provision");

/// Errors raised while provisioning or updating the installation.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A directory could not be created.
    #[error("failed to create directory '{}': {source}", path.display())]
    CreateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// `update` ran before `setup`.
    #[error("install path '{}' does not exist; run 'corsica setup' first", path.display())]
    MissingInstallPath {
        /// Configured install path.
        path: PathBuf,
    },
    /// The package manager failed.
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Prepares and updates the server installation.
#[derive(Debug)]
pub struct Provisioner<S> {
    install_path: PathBuf,
    plugins_dir: PathBuf,
    package_manager: String,
    server_package: String,
    shell: S,
}

impl<S: ShellExecutor> Provisioner<S> {
    /// Builds a provisioner from configuration.
    #[must_use]
    pub fn from_config(config: &Config, shell: S) -> Self {
        Self {
            install_path: config.install_path().into_std_path_buf(),
            plugins_dir: config.plugins_dir().into_std_path_buf(),
            package_manager: config.package_manager().to_owned(),
            server_package: config.server_package().to_owned(),
            shell,
        }
    }

    /// Install path being provisioned.
    #[must_use]
    pub fn install_path(&self) -> &Path {
        &self.install_path
    }

    /// Creates the installation directories and installs the server package.
    ///
    /// Safe to repeat: existing directories are kept and the package manager
    /// reinstalls or upgrades the package in place.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::CreateDirectory`] or [`ProvisionError::Exec`].
    pub fn setup(&self) -> Result<(), ProvisionError> {
        create_dir(&self.install_path)?;
        create_dir(&self.plugins_dir)?;
        info!(
            target: PROVISION_TARGET,
            path = %self.install_path.display(),
            package = %self.server_package,
            "installing server package"
        );
        self.shell.run(
            &ShellCommand::new(&self.package_manager)
                .arg("install")
                .arg("--prefix")
                .arg(&self.install_path)
                .arg(&self.server_package)
                .current_dir(&self.install_path),
        )?;
        info!(target: PROVISION_TARGET, "setup complete");
        Ok(())
    }

    /// Updates the server package, then the plugins when any are installed.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::MissingInstallPath`] before `setup` has run,
    /// or [`ProvisionError::Exec`] when the package manager fails.
    pub fn update(&self) -> Result<(), ProvisionError> {
        if !self.install_path.is_dir() {
            return Err(ProvisionError::MissingInstallPath {
                path: self.install_path.clone(),
            });
        }
        self.run_update(&self.install_path)?;
        if self.plugins_dir.is_dir() {
            self.run_update(&self.plugins_dir)?;
        }
        Ok(())
    }

    fn run_update(&self, prefix: &Path) -> Result<(), ProvisionError> {
        info!(target: PROVISION_TARGET, prefix = %prefix.display(), "updating packages");
        self.shell.run(
            &ShellCommand::new(&self.package_manager)
                .arg("update")
                .arg("--prefix")
                .arg(prefix)
                .current_dir(prefix),
        )?;
        Ok(())
    }
}

fn create_dir(path: &Path) -> Result<(), ProvisionError> {
    fs::create_dir_all(path).map_err(|source| ProvisionError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}
