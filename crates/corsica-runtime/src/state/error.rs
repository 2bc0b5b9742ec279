use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::process::ProcessError;

/// Errors raised while reading, locking, or persisting runtime state.
#[derive(Debug, Error)]
pub enum StateError {
    /// Reading the state document failed.
    #[error("failed to read runtime state '{}': {source}", path.display())]
    Read {
        /// State document path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The state document is not valid JSON for the expected schema.
    #[error("runtime state '{}' is corrupt: {source}", path.display())]
    Corrupt {
        /// State document path.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
    /// Serialising the state document failed.
    #[error("failed to serialise runtime state: {0}")]
    Serialise(#[source] serde_json::Error),
    /// Persisting the state document failed.
    #[error("failed to write runtime state '{}': {source}", path.display())]
    Write {
        /// State document path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Creating or removing the lock file failed.
    #[error("failed to manage state lock '{}': {source}", path.display())]
    Lock {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Another live invocation held the lock for the whole wait budget.
    #[error(
        "runtime state is locked by another corsica process (pid {owner}); gave up after {}ms",
        waited.as_millis()
    )]
    LockBusy {
        /// Process holding the lock, or zero when it had not recorded itself yet.
        owner: u32,
        /// Time spent waiting.
        waited: Duration,
    },
    /// Checking whether the lock owner is alive failed.
    #[error(transparent)]
    Process(#[from] ProcessError),
}
