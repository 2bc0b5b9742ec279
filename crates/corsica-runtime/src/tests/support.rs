//! Fixtures shared by unit and behaviour tests.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use camino::Utf8PathBuf;
use corsica_config::{Config, RuntimePaths};
use mockall::mock;
use tempfile::TempDir;

use crate::lifecycle::{InterruptSignal, LifecycleError, LifecycleTimings, ReadinessProbe};
use crate::shell::{ExecError, ShellCommand, ShellExecutor, ShellOutput};
use crate::state::StateStore;

mock! {
    pub Shell {}
    impl ShellExecutor for Shell {
        fn run(&self, command: &ShellCommand) -> Result<ShellOutput, ExecError>;
    }
}

/// Configuration rooted at `install_path`.
pub(crate) fn config_for(install_path: &Path) -> Config {
    Config {
        install_path: Some(
            Utf8PathBuf::from_path_buf(install_path.to_path_buf()).expect("utf-8 temp path"),
        ),
        ..Config::default()
    }
}

/// Store over a provisioned temporary install path.
pub(crate) fn store_in(dir: &TempDir) -> StateStore {
    let paths = RuntimePaths::from_config(&config_for(dir.path())).expect("derive paths");
    StateStore::new(paths).with_lock_wait(Duration::from_secs(2))
}

/// Budgets short enough for tests yet long enough for real processes.
pub(crate) fn fast_timings() -> LifecycleTimings {
    LifecycleTimings {
        readiness_timeout: Duration::from_secs(5),
        stop_grace: Duration::from_secs(2),
        kill_timeout: Duration::from_secs(2),
        poll_interval: Duration::from_millis(20),
    }
}

/// Pid of a process that has exited and been reaped.
pub(crate) fn dead_pid() -> u32 {
    let mut child = Command::new("true").spawn().expect("spawn true");
    let pid = child.id();
    child.wait().expect("reap true");
    pid
}

/// Probe returning a fixed answer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedProbe(pub bool);

impl ReadinessProbe for FixedProbe {
    fn is_ready(&self) -> Result<bool, LifecycleError> {
        Ok(self.0)
    }

    fn describe(&self) -> String {
        format!("fixed {}", self.0)
    }
}

/// Probe reporting ready once a marker file exists.
#[derive(Debug, Clone)]
pub(crate) struct MarkerProbe(pub PathBuf);

impl ReadinessProbe for MarkerProbe {
    fn is_ready(&self) -> Result<bool, LifecycleError> {
        Ok(self.0.exists())
    }

    fn describe(&self) -> String {
        format!("marker {}", self.0.display())
    }
}

/// Interrupt source firing after a number of polls, or never.
#[derive(Debug)]
pub(crate) struct ScriptedInterrupts {
    remaining: Option<usize>,
}

impl ScriptedInterrupts {
    pub(crate) const fn never() -> Self {
        Self { remaining: None }
    }

    pub(crate) const fn after(polls: usize) -> Self {
        Self {
            remaining: Some(polls),
        }
    }
}

impl InterruptSignal for ScriptedInterrupts {
    fn interrupted(&mut self) -> bool {
        match self.remaining.as_mut() {
            Some(0) => true,
            Some(remaining) => {
                *remaining -= 1;
                false
            }
            None => false,
        }
    }
}

/// Package manager double that mimics `npm install --prefix` on disk.
#[derive(Debug, Default)]
pub(crate) struct FakePackageManager {
    commands: RefCell<Vec<ShellCommand>>,
    failing_exit: Cell<Option<i32>>,
}

impl FakePackageManager {
    pub(crate) fn fail_with(&self, exit_code: i32) {
        self.failing_exit.set(Some(exit_code));
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands
            .borrow()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn prefix(command: &ShellCommand) -> Option<PathBuf> {
        let args = command.args();
        args.iter()
            .position(|arg| arg == "--prefix")
            .and_then(|index| args.get(index + 1))
            .map(PathBuf::from)
    }
}

impl ShellExecutor for FakePackageManager {
    fn run(&self, command: &ShellCommand) -> Result<ShellOutput, ExecError> {
        self.commands.borrow_mut().push(command.clone());
        if let Some(exit_code) = self.failing_exit.get() {
            return Err(ExecError::NonZeroExit {
                command: command.to_string(),
                exit_code: Some(exit_code),
                stderr: "npm ERR! 404 Not Found".to_owned(),
            });
        }
        let installing = command.args().first().is_some_and(|verb| verb == "install");
        if installing
            && let (Some(prefix), Some(package)) = (Self::prefix(command), command.args().last())
        {
            fs::create_dir_all(prefix.join("node_modules").join(package))
                .expect("create fake package directory");
        }
        Ok(ShellOutput::default())
    }
}
