use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use nix::fcntl::{Flock, FlockArg};
use tracing::{debug, warn};

use super::STATE_TARGET;
use super::error::StateError;
use crate::process::{self, SignalTarget};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Advisory lock file recording the pid of the invocation that owns it.
///
/// Dropping the guard removes the file.
#[derive(Debug)]
pub(super) struct StateLock {
    path: PathBuf,
    _file: File,
}

impl StateLock {
    /// Creates the lock file, waiting up to `wait` for a live owner to finish.
    ///
    /// Locks left behind by processes that no longer exist are reclaimed.
    pub(super) fn acquire(path: &Path, wait: Duration) -> Result<Self, StateError> {
        let started = Instant::now();
        loop {
            if let Some(file) = try_create(path)? {
                debug!(target: STATE_TARGET, file = %path.display(), "acquired state lock");
                return Ok(Self {
                    path: path.to_path_buf(),
                    _file: file,
                });
            }

            let owner = read_owner(path);
            if let Some(pid) = owner
                && !process::is_alive(pid, SignalTarget::Process)?
            {
                warn!(
                    target: STATE_TARGET,
                    pid,
                    file = %path.display(),
                    "reclaiming state lock left by a dead process"
                );
                reclaim(path, pid)?;
                continue;
            }

            let waited = started.elapsed();
            if waited >= wait {
                return Err(StateError::LockBusy {
                    owner: owner.unwrap_or(0),
                    waited,
                });
            }
            thread::sleep(LOCK_POLL_INTERVAL);
        }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => {
                warn!(
                    target: STATE_TARGET,
                    file = %self.path.display(),
                    error = %error,
                    "failed to remove state lock"
                );
            }
            _ => debug!(target: STATE_TARGET, file = %self.path.display(), "released state lock"),
        }
    }
}

fn try_create(path: &Path) -> Result<Option<File>, StateError> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let lock_error = |source| StateError::Lock {
        path: path.to_path_buf(),
        source,
    };
    match options.open(path) {
        Ok(mut file) => {
            writeln!(file, "{}", std::process::id()).map_err(lock_error)?;
            file.sync_all().map_err(lock_error)?;
            Ok(Some(file))
        }
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => Ok(None),
        Err(source) => Err(lock_error(source)),
    }
}

/// Owner pid, or `None` while the owner has not finished writing it.
fn read_owner(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    content.trim().parse::<u32>().ok().filter(|pid| *pid != 0)
}

/// Removes a lock judged stale, unless another invocation got there first.
///
/// Reclaimers serialise on a kernel lock over a side file, which is released
/// when its holder exits however it exits. Under that lock the owner is read
/// again: only the dead process could have removed its own file, so a lock
/// still naming it cannot change before it is removed.
fn reclaim(path: &Path, dead_owner: u32) -> Result<(), StateError> {
    let guard_path = path.with_extension("lock.reclaim");
    let guard_error = |source| StateError::Lock {
        path: guard_path.clone(),
        source,
    };
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let file = options.open(&guard_path).map_err(guard_error)?;
    let _guard = Flock::lock(file, FlockArg::LockExclusive)
        .map_err(|(_, errno)| guard_error(io::Error::from(errno)))?;

    if read_owner(path) == Some(dead_owner) {
        remove_lock(path)
    } else {
        debug!(target: STATE_TARGET, file = %path.display(), "state lock already reclaimed");
        Ok(())
    }
}

fn remove_lock(path: &Path) -> Result<(), StateError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StateError::Lock {
            path: path.to_path_buf(),
            source,
        }),
    }
}
