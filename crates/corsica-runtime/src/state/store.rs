use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use corsica_config::RuntimePaths;
use tracing::debug;

use super::error::StateError;
use super::files::atomic_write;
use super::lock::StateLock;
use super::records::RuntimeState;
use super::{DEFAULT_LOCK_WAIT, STATE_TARGET};

/// Reads and writes the runtime state document.
#[derive(Debug, Clone)]
pub struct StateStore {
    paths: RuntimePaths,
    lock_wait: Duration,
}

impl StateStore {
    /// Creates a store over the provided runtime paths.
    #[must_use]
    pub fn new(paths: RuntimePaths) -> Self {
        Self {
            paths,
            lock_wait: DEFAULT_LOCK_WAIT,
        }
    }

    /// Overrides how long [`StateStore::lock`] waits for a busy lock.
    #[must_use]
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    /// Runtime paths backing the store.
    #[must_use]
    pub const fn paths(&self) -> &RuntimePaths {
        &self.paths
    }

    /// Reads the current state without taking the lock.
    ///
    /// A missing document yields the empty state.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Read`] or [`StateError::Corrupt`].
    pub fn load(&self) -> Result<RuntimeState, StateError> {
        read_state(self.paths.state_path())
    }

    /// Takes the advisory lock and loads the state beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::LockBusy`] when another live invocation holds
    /// the lock beyond the wait budget, or any error from loading.
    pub fn lock(&self) -> Result<StateGuard, StateError> {
        let lock = StateLock::acquire(self.paths.lock_path(), self.lock_wait)?;
        let state = self.load()?;
        Ok(StateGuard {
            state_path: self.paths.state_path().to_path_buf(),
            state,
            _lock: lock,
        })
    }
}

/// Exclusive access to the runtime state until dropped.
#[derive(Debug)]
pub struct StateGuard {
    state_path: PathBuf,
    state: RuntimeState,
    _lock: StateLock,
}

impl StateGuard {
    /// State as loaded, including uncommitted changes.
    #[must_use]
    pub const fn state(&self) -> &RuntimeState {
        &self.state
    }

    /// Mutable access; call [`StateGuard::commit`] to persist.
    pub fn state_mut(&mut self) -> &mut RuntimeState {
        &mut self.state
    }

    /// Atomically persists the current state.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Serialise`] or [`StateError::Write`].
    pub fn commit(&self) -> Result<(), StateError> {
        let mut payload = serde_json::to_vec_pretty(&self.state).map_err(StateError::Serialise)?;
        payload.push(b'\n');
        atomic_write(&self.state_path, &payload).map_err(|source| StateError::Write {
            path: self.state_path.clone(),
            source,
        })?;
        debug!(
            target: STATE_TARGET,
            file = %self.state_path.display(),
            plugins = self.state.plugins.len(),
            server = self.state.server.as_ref().map(|record| record.pid),
            "runtime state committed"
        );
        Ok(())
    }
}

fn read_state(path: &Path) -> Result<RuntimeState, StateError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Ok(RuntimeState::default());
        }
        Err(source) => {
            return Err(StateError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_slice(&bytes).map_err(|source| StateError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}
