use std::os::unix::process::ExitStatusExt;
use std::process::{Child, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use corsica_config::{Config, RuntimePaths};
use nix::sys::signal::Signal;
use tracing::{debug, info, warn};

use super::command::ServerCommand;
use super::error::LifecycleError;
use super::interrupts::{InterruptSignal, SystemInterrupts};
use super::readiness::{ReadinessProbe, TcpPortProbe};
use super::spawning::{spawn_detached, spawn_foreground};
use super::{
    ForegroundExit, LIFECYCLE_TARGET, LifecycleTimings, ServerState, ServerStatus, StartMode,
    StartOutcome,
};
use crate::process::{self, SignalTarget};
use crate::state::{ServerProcessRecord, StateGuard, StateStore, unix_timestamp};

/// Starts, stops, and inspects the server process.
///
/// At most one server is recorded at a time. Children launched by this
/// manager are kept so their exit can be observed (and the zombie reaped)
/// without relying on `kill(2)` probes alone.
#[derive(Debug)]
pub struct LifecycleManager<P = TcpPortProbe> {
    store: StateStore,
    server: ServerCommand,
    probe: P,
    timings: LifecycleTimings,
    state: ServerState,
    spawned: Option<Child>,
}

impl LifecycleManager<TcpPortProbe> {
    /// Builds a manager probing the configured port for readiness.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Paths`] when the installation is missing and
    /// [`LifecycleError::EmptyServerCommand`] for a blank launch command.
    pub fn from_config(config: &Config) -> Result<Self, LifecycleError> {
        let paths = RuntimePaths::from_config(config)?;
        Ok(Self::new(
            StateStore::new(paths),
            ServerCommand::parse(config.server_command())?,
            TcpPortProbe::new(config.server_port()),
            LifecycleTimings::from_config(config),
        ))
    }
}

impl<P: ReadinessProbe> LifecycleManager<P> {
    /// Assembles a manager from its parts.
    #[must_use]
    pub const fn new(
        store: StateStore,
        server: ServerCommand,
        probe: P,
        timings: LifecycleTimings,
    ) -> Self {
        Self {
            store,
            server,
            probe,
            timings,
            state: ServerState::Stopped,
            spawned: None,
        }
    }

    /// State as last observed by this manager.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Store holding the server record.
    #[must_use]
    pub const fn store(&self) -> &StateStore {
        &self.store
    }

    /// Starts the server in the requested mode.
    ///
    /// # Errors
    ///
    /// See [`LifecycleManager::start`] and
    /// [`LifecycleManager::start_in_background`].
    pub fn launch(&mut self, mode: StartMode) -> Result<StartOutcome, LifecycleError> {
        self.launch_with(mode, |_| {})
    }

    /// [`LifecycleManager::launch`], calling `on_launched` once the server
    /// process exists and is recorded.
    ///
    /// `on_launched` runs before a foreground server is supervised and before
    /// a background server is checked for readiness. It is not called when
    /// nothing was spawned.
    ///
    /// # Errors
    ///
    /// As for [`LifecycleManager::launch`].
    pub fn launch_with<F>(
        &mut self,
        mode: StartMode,
        on_launched: F,
    ) -> Result<StartOutcome, LifecycleError>
    where
        F: FnOnce(&ServerProcessRecord),
    {
        match mode {
            StartMode::Foreground => {
                let mut interrupts = SystemInterrupts::install()?;
                self.run_foreground(&mut interrupts, on_launched).map(StartOutcome::Foreground)
            }
            StartMode::Background => self.run_background(on_launched).map(StartOutcome::Background),
        }
    }

    /// Runs the server attached to the terminal until it exits.
    ///
    /// `SIGINT`, `SIGTERM`, and `SIGHUP` received meanwhile stop the server
    /// (escalating to `SIGKILL` after the grace period) instead of killing the
    /// CLI outright. The record is removed once the server has exited.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyRunning`] when a live server is
    /// recorded, [`LifecycleError::ServerFailed`] when the server exits with
    /// a non-zero status, and [`LifecycleError::StopFailed`] when an
    /// interrupted server refuses to die.
    pub fn start(&mut self) -> Result<ForegroundExit, LifecycleError> {
        let mut interrupts = SystemInterrupts::install()?;
        self.run_foreground(&mut interrupts, |_| {})
    }

    /// [`LifecycleManager::start`] with a caller-supplied interrupt source.
    ///
    /// # Errors
    ///
    /// As for [`LifecycleManager::start`].
    pub fn start_with_interrupts<I: InterruptSignal>(
        &mut self,
        interrupts: &mut I,
    ) -> Result<ForegroundExit, LifecycleError> {
        self.run_foreground(interrupts, |_| {})
    }

    /// Launches the server detached and waits until it is ready.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyRunning`] when a live server is
    /// recorded, [`LifecycleError::ExitedEarly`] (record removed) when the
    /// server dies before becoming ready, and
    /// [`LifecycleError::ReadinessTimeout`] (record kept) when it stays alive
    /// but never becomes ready.
    pub fn start_in_background(&mut self) -> Result<ServerProcessRecord, LifecycleError> {
        self.run_background(|_| {})
    }

    pub(super) fn run_foreground<I, F>(
        &mut self,
        interrupts: &mut I,
        on_launched: F,
    ) -> Result<ForegroundExit, LifecycleError>
    where
        I: InterruptSignal,
        F: FnOnce(&ServerProcessRecord),
    {
        let (mut child, record) = self.begin_launch(StartMode::Foreground)?;
        self.transition(ServerState::Running);
        on_launched(&record);

        let outcome = self.supervise_foreground(&mut child, record.pid, interrupts);
        match &outcome {
            Ok(_) | Err(LifecycleError::ServerFailed { .. }) => {
                self.transition(ServerState::Stopped);
                self.clear_record(record.pid)?;
            }
            Err(_) => self.transition(ServerState::Running),
        }
        outcome
    }

    fn run_background<F>(&mut self, on_launched: F) -> Result<ServerProcessRecord, LifecycleError>
    where
        F: FnOnce(&ServerProcessRecord),
    {
        let (child, record) = self.begin_launch(StartMode::Background)?;
        self.spawned = Some(child);
        on_launched(&record);

        let ready = self.wait_for_ready(&record);
        // Anything short of an early exit leaves a live, recorded server.
        if self.state == ServerState::Starting {
            self.transition(ServerState::Running);
        }
        ready?;
        info!(
            target: LIFECYCLE_TARGET,
            pid = record.pid,
            log = %self.store.paths().log_path().display(),
            "server ready in background"
        );
        Ok(record)
    }

    /// Stops the recorded server and removes its record.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotRunning`] when no live server is recorded
    /// (a stale record is removed first), and [`LifecycleError::StopFailed`]
    /// when the server survives `SIGKILL`; its record is then kept.
    pub fn stop(&mut self) -> Result<ServerProcessRecord, LifecycleError> {
        let mut guard = self.store.lock()?;
        let Some(record) = self.live_record(&mut guard)? else {
            self.transition(ServerState::Stopped);
            return Err(LifecycleError::NotRunning);
        };

        self.transition(ServerState::Stopping);
        if let Err(error) = self.terminate(&record) {
            self.transition(ServerState::Running);
            return Err(error);
        }

        guard.state_mut().server = None;
        guard.commit()?;
        self.transition(ServerState::Stopped);
        info!(target: LIFECYCLE_TARGET, pid = record.pid, "server stopped");
        Ok(record)
    }

    /// Stops the server when one is running.
    ///
    /// # Errors
    ///
    /// Any [`LifecycleManager::stop`] error other than
    /// [`LifecycleError::NotRunning`].
    pub fn stop_if_running(&mut self) -> Result<Option<ServerProcessRecord>, LifecycleError> {
        match self.stop() {
            Ok(record) => Ok(Some(record)),
            Err(LifecycleError::NotRunning) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Stops any running server, then starts a new one.
    ///
    /// Nothing is started when stopping fails.
    ///
    /// # Errors
    ///
    /// Errors from [`LifecycleManager::stop_if_running`] and
    /// [`LifecycleManager::launch`].
    pub fn restart(&mut self, mode: StartMode) -> Result<StartOutcome, LifecycleError> {
        self.restart_with(mode, |_| {})
    }

    /// [`LifecycleManager::restart`] with a launch callback, as for
    /// [`LifecycleManager::launch_with`].
    ///
    /// # Errors
    ///
    /// As for [`LifecycleManager::restart`].
    pub fn restart_with<F>(
        &mut self,
        mode: StartMode,
        on_launched: F,
    ) -> Result<StartOutcome, LifecycleError>
    where
        F: FnOnce(&ServerProcessRecord),
    {
        if let Some(previous) = self.stop_if_running()? {
            debug!(
                target: LIFECYCLE_TARGET,
                pid = previous.pid,
                "previous server stopped for restart"
            );
        }
        self.launch_with(mode, on_launched)
    }

    /// Reports whether a live server is recorded, removing stale records.
    ///
    /// # Errors
    ///
    /// Returns state or liveness probe failures.
    pub fn status(&mut self) -> Result<ServerStatus, LifecycleError> {
        let mut guard = self.store.lock()?;
        let status = match self.live_record(&mut guard)? {
            Some(record) => ServerStatus::Running(record),
            None => ServerStatus::Stopped,
        };
        Ok(status)
    }

    fn begin_launch(
        &mut self,
        mode: StartMode,
    ) -> Result<(Child, ServerProcessRecord), LifecycleError> {
        let mut guard = self.store.lock()?;
        if let Some(existing) = self.live_record(&mut guard)? {
            return Err(LifecycleError::AlreadyRunning { pid: existing.pid });
        }

        self.transition(ServerState::Starting);
        let paths = self.store.paths();
        let spawned = match mode {
            StartMode::Foreground => spawn_foreground(&self.server, paths.install_path()),
            StartMode::Background => {
                spawn_detached(&self.server, paths.install_path(), paths.log_path())
            }
        };
        let mut child = match spawned {
            Ok(child) => child,
            Err(error) => {
                self.transition(ServerState::Stopped);
                return Err(error);
            }
        };

        let record = ServerProcessRecord {
            pid: child.id(),
            started_at: unix_timestamp(),
            backgrounded: mode == StartMode::Background,
        };
        guard.state_mut().server = Some(record.clone());
        if let Err(error) = guard.commit() {
            discard(&mut child);
            self.transition(ServerState::Stopped);
            return Err(error.into());
        }
        info!(
            target: LIFECYCLE_TARGET,
            pid = record.pid,
            program = self.server.program(),
            background = record.backgrounded,
            "server launched"
        );
        Ok((child, record))
    }

    /// Returns the recorded server if it is alive, clearing a stale record.
    fn live_record(
        &mut self,
        guard: &mut StateGuard,
    ) -> Result<Option<ServerProcessRecord>, LifecycleError> {
        let Some(record) = guard.state().server.clone() else {
            return Ok(None);
        };
        if self.is_alive(&record)? {
            return Ok(Some(record));
        }
        warn!(
            target: LIFECYCLE_TARGET,
            pid = record.pid,
            "server record is stale; clearing it"
        );
        guard.state_mut().server = None;
        guard.commit()?;
        Ok(None)
    }

    fn is_alive(&mut self, record: &ServerProcessRecord) -> Result<bool, LifecycleError> {
        let held = self
            .spawned
            .as_ref()
            .is_some_and(|child| child.id() == record.pid);
        if held && self.spawned_exit()?.is_none() {
            return Ok(true);
        }
        let target = SignalTarget::for_server(record.backgrounded);
        Ok(process::is_alive(record.pid, target)?)
    }

    /// Polls the held child, dropping it once it has exited.
    fn spawned_exit(&mut self) -> Result<Option<ExitStatus>, LifecycleError> {
        let Some(child) = self.spawned.as_mut() else {
            return Ok(None);
        };
        let status = child
            .try_wait()
            .map_err(|source| LifecycleError::MonitorChild { source })?;
        if status.is_some() {
            self.spawned = None;
        }
        Ok(status)
    }

    fn wait_for_ready(&mut self, record: &ServerProcessRecord) -> Result<(), LifecycleError> {
        let deadline = Instant::now() + self.timings.readiness_timeout;
        loop {
            if let Some(status) = self.spawned_exit()? {
                self.transition(ServerState::Stopped);
                self.clear_record(record.pid)?;
                return Err(LifecycleError::ExitedEarly {
                    pid: record.pid,
                    exit_status: status.code(),
                    log_path: self.store.paths().log_path().to_path_buf(),
                });
            }
            if self.probe.is_ready()? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!(
                    target: LIFECYCLE_TARGET,
                    pid = record.pid,
                    probe = %self.probe.describe(),
                    "server did not become ready in time; leaving it running"
                );
                return Err(LifecycleError::ReadinessTimeout {
                    pid: record.pid,
                    timeout_ms: millis(self.timings.readiness_timeout),
                    probe: self.probe.describe(),
                });
            }
            thread::sleep(self.timings.poll_interval);
        }
    }

    fn supervise_foreground<I: InterruptSignal>(
        &mut self,
        child: &mut Child,
        pid: u32,
        interrupts: &mut I,
    ) -> Result<ForegroundExit, LifecycleError> {
        loop {
            if interrupts.interrupted() {
                self.transition(ServerState::Stopping);
                self.terminate_child(child, pid)?;
                return Ok(ForegroundExit::Interrupted { pid });
            }
            let exited = child
                .try_wait()
                .map_err(|source| LifecycleError::MonitorChild { source })?;
            if let Some(status) = exited {
                return foreground_exit(pid, status);
            }
            thread::sleep(self.timings.poll_interval);
        }
    }

    fn terminate_child(&self, child: &mut Child, pid: u32) -> Result<(), LifecycleError> {
        let started = Instant::now();
        process::send_signal(pid, SignalTarget::Process, Signal::SIGTERM)?;
        if self.wait_for_child(child, self.timings.stop_grace)? {
            return Ok(());
        }
        warn!(target: LIFECYCLE_TARGET, pid, "server ignored SIGTERM; sending SIGKILL");
        child
            .kill()
            .map_err(|source| LifecycleError::MonitorChild { source })?;
        if self.wait_for_child(child, self.timings.kill_timeout)? {
            return Ok(());
        }
        Err(LifecycleError::StopFailed {
            pid,
            waited_ms: millis(started.elapsed()),
        })
    }

    fn wait_for_child(&self, child: &mut Child, budget: Duration) -> Result<bool, LifecycleError> {
        let deadline = Instant::now() + budget;
        loop {
            let exited = child
                .try_wait()
                .map_err(|source| LifecycleError::MonitorChild { source })?;
            if exited.is_some() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(self.timings.poll_interval);
        }
    }

    fn terminate(&mut self, record: &ServerProcessRecord) -> Result<(), LifecycleError> {
        let started = Instant::now();
        let target = SignalTarget::for_server(record.backgrounded);
        if !process::send_signal(record.pid, target, Signal::SIGTERM)? {
            return Ok(());
        }
        debug!(target: LIFECYCLE_TARGET, pid = record.pid, "sent SIGTERM");
        if self.wait_for_exit(record, self.timings.stop_grace)? {
            return Ok(());
        }

        warn!(
            target: LIFECYCLE_TARGET,
            pid = record.pid,
            grace_ms = millis(self.timings.stop_grace),
            "server ignored SIGTERM; sending SIGKILL"
        );
        if !process::send_signal(record.pid, target, Signal::SIGKILL)? {
            return Ok(());
        }
        if self.wait_for_exit(record, self.timings.kill_timeout)? {
            return Ok(());
        }
        Err(LifecycleError::StopFailed {
            pid: record.pid,
            waited_ms: millis(started.elapsed()),
        })
    }

    fn wait_for_exit(
        &mut self,
        record: &ServerProcessRecord,
        budget: Duration,
    ) -> Result<bool, LifecycleError> {
        let deadline = Instant::now() + budget;
        loop {
            if !self.is_alive(record)? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(self.timings.poll_interval);
        }
    }

    fn clear_record(&self, pid: u32) -> Result<(), LifecycleError> {
        let mut guard = self.store.lock()?;
        if guard
            .state()
            .server
            .as_ref()
            .is_some_and(|record| record.pid == pid)
        {
            guard.state_mut().server = None;
            guard.commit()?;
        }
        Ok(())
    }

    fn transition(&mut self, next: ServerState) {
        if self.state != next {
            debug!(
                target: LIFECYCLE_TARGET,
                from = %self.state,
                to = %next,
                "server state transition"
            );
            self.state = next;
        }
    }
}

fn foreground_exit(pid: u32, status: ExitStatus) -> Result<ForegroundExit, LifecycleError> {
    if status.success() {
        info!(target: LIFECYCLE_TARGET, pid, "server exited");
        return Ok(ForegroundExit::Completed { pid });
    }
    if let Some(signal) = status.signal() {
        info!(target: LIFECYCLE_TARGET, pid, signal, "server terminated by signal");
        return Ok(ForegroundExit::Terminated { pid, signal });
    }
    Err(LifecycleError::ServerFailed {
        pid,
        exit_status: status.code(),
    })
}

/// Kills and reaps a child whose launch is being abandoned.
fn discard(child: &mut Child) {
    if let Err(error) = child.kill() {
        warn!(
            target: LIFECYCLE_TARGET,
            pid = child.id(),
            %error,
            "failed to kill abandoned server"
        );
    }
    if let Err(error) = child.wait() {
        warn!(
            target: LIFECYCLE_TARGET,
            pid = child.id(),
            %error,
            "failed to reap abandoned server"
        );
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
