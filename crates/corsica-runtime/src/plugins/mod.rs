//! Plugin installation and bookkeeping.
//!
//! Plugins are npm packages installed with `<package manager> install
//! --prefix <plugins_dir>`, so each lands in `<plugins_dir>/node_modules/`.
//! The runtime state is the source of truth for what is installed: files the
//! package manager left behind after a failed install are never reported.

use std::collections::BTreeMap;
use std::collections::btree_map::IntoValues;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use corsica_config::{Config, RuntimePaths};
use tracing::{info, warn};

use crate::shell::{ShellCommand, ShellExecutor};
use crate::state::{PluginRecord, StateStore, unix_timestamp};

mod error;
mod name;

pub use error::PluginError;
pub use name::validate_plugin_name;

const PLUGINS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::plugins");

/// Installs, removes, and lists plugins.
#[derive(Debug)]
pub struct PluginManager<S> {
    store: StateStore,
    shell: S,
    package_manager: String,
}

impl<S: ShellExecutor> PluginManager<S> {
    /// Builds a manager from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Paths`] when the installation is missing.
    pub fn from_config(config: &Config, shell: S) -> Result<Self, PluginError> {
        let paths = RuntimePaths::from_config(config)?;
        Ok(Self::new(
            StateStore::new(paths),
            shell,
            config.package_manager(),
        ))
    }

    /// Assembles a manager from its parts.
    #[must_use]
    pub fn new(store: StateStore, shell: S, package_manager: impl Into<String>) -> Self {
        Self {
            store,
            shell,
            package_manager: package_manager.into(),
        }
    }

    /// Shell executor used for package manager invocations.
    #[must_use]
    pub const fn shell(&self) -> &S {
        &self.shell
    }

    fn plugins_dir(&self) -> &Path {
        self.store.paths().plugins_dir()
    }

    fn package_command(&self, verb: &str, name: &str) -> ShellCommand {
        ShellCommand::new(&self.package_manager)
            .arg(verb)
            .arg("--prefix")
            .arg(self.plugins_dir())
            .arg(name)
            .current_dir(self.plugins_dir())
    }

    /// Installs `name` and records it.
    ///
    /// The state lock is only taken to record the plugin, never while the
    /// package manager runs, so lifecycle commands are not held up by a slow
    /// download.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidName`], [`PluginError::AlreadyInstalled`],
    /// or [`PluginError::Install`] when the package manager fails; nothing is
    /// recorded in any of these cases.
    pub fn install(&self, name: &str) -> Result<PluginRecord, PluginError> {
        validate_plugin_name(name)?;
        if self.store.load()?.plugins.contains_key(name) {
            return Err(PluginError::AlreadyInstalled {
                name: name.to_owned(),
            });
        }

        fs::create_dir_all(self.plugins_dir()).map_err(|source| {
            PluginError::PluginsDirectory {
                path: self.plugins_dir().to_path_buf(),
                source,
            }
        })?;
        info!(target: PLUGINS_TARGET, plugin = name, "installing plugin");
        self.shell
            .run(&self.package_command("install", name))
            .map_err(|source| PluginError::Install {
                name: name.to_owned(),
                source,
            })?;

        let record = PluginRecord {
            name: name.to_owned(),
            install_path: package_dir(self.plugins_dir(), name),
            installed_at: unix_timestamp(),
        };
        let mut guard = self.store.lock()?;
        if guard.state().plugins.contains_key(name) {
            return Err(PluginError::AlreadyInstalled {
                name: name.to_owned(),
            });
        }
        guard
            .state_mut()
            .plugins
            .insert(record.name.clone(), record.clone());
        guard.commit()?;
        info!(
            target: PLUGINS_TARGET,
            plugin = name,
            path = %record.install_path.display(),
            "plugin installed"
        );
        Ok(record)
    }

    /// Uninstalls `name`, deletes its files, and forgets it.
    ///
    /// A failing package manager is tolerated as long as the plugin's
    /// directory can still be deleted. As with [`PluginManager::install`],
    /// the state lock is held only while the record is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotInstalled`] for unknown names and
    /// [`PluginError::Remove`] when the files cannot be deleted; the record
    /// is kept in that case.
    pub fn remove(&self, name: &str) -> Result<PluginRecord, PluginError> {
        let Some(record) = self.store.load()?.plugins.remove(name) else {
            return Err(PluginError::NotInstalled {
                name: name.to_owned(),
            });
        };

        info!(target: PLUGINS_TARGET, plugin = name, "removing plugin");
        if let Err(error) = self.shell.run(&self.package_command("uninstall", name)) {
            warn!(
                target: PLUGINS_TARGET,
                plugin = name,
                %error,
                "package manager failed to uninstall plugin; deleting its files directly"
            );
        }
        remove_dir(&record.install_path).map_err(|source| PluginError::Remove {
            name: name.to_owned(),
            path: record.install_path.clone(),
            source,
        })?;

        let mut guard = self.store.lock()?;
        if guard.state_mut().plugins.remove(name).is_some() {
            guard.commit()?;
        }
        info!(target: PLUGINS_TARGET, plugin = name, "plugin removed");
        Ok(record)
    }

    /// Lists installed plugins in name order.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::State`] when the state cannot be read.
    pub fn list(&self) -> Result<PluginList, PluginError> {
        let state = self.store.load()?;
        Ok(PluginList::new(state.plugins))
    }
}

/// Directory npm creates for `name` under a `--prefix` install.
fn package_dir(plugins_dir: &Path, name: &str) -> PathBuf {
    name.split('/')
        .fold(plugins_dir.join("node_modules"), |path, segment| {
            path.join(segment)
        })
}

fn remove_dir(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Name and installation time of one plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSummary {
    /// Package name.
    pub name: String,
    /// Installation time in seconds since the Unix epoch.
    pub installed_at: u64,
}

/// Installed plugins, yielded in name order.
#[derive(Debug)]
pub struct PluginList {
    records: IntoValues<String, PluginRecord>,
}

impl PluginList {
    fn new(records: BTreeMap<String, PluginRecord>) -> Self {
        Self {
            records: records.into_values(),
        }
    }
}

impl Iterator for PluginList {
    type Item = PluginSummary;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next().map(|record| PluginSummary {
            name: record.name,
            installed_at: record.installed_at,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for PluginList {}
