//! Behaviour-driven tests for the server lifecycle.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use crate::lifecycle::{
    LifecycleError, LifecycleManager, ServerCommand, ServerStatus, StartMode, StartOutcome,
};
use crate::state::ServerProcessRecord;

use super::support::{FixedProbe, dead_pid, fast_timings, store_in};

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

struct TestWorld {
    dir: TempDir,
    manager: LifecycleManager<FixedProbe>,
    result: Option<Result<Option<u32>, LifecycleError>>,
    first_pid: Option<u32>,
}

impl TestWorld {
    fn with_command(dir: TempDir, command: &str, ready: bool) -> Self {
        let manager = LifecycleManager::new(
            store_in(&dir),
            ServerCommand::parse(command).expect("server command"),
            FixedProbe(ready),
            fast_timings(),
        );
        Self {
            dir,
            manager,
            result: None,
            first_pid: None,
        }
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        if let Err(error) = self.manager.stop_if_running() {
            tracing::warn!(%error, "failed to stop test server");
        }
    }
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::with_command(TempDir::new().expect("temp dir"), "sleep 30", true)
}

fn status(world: &mut TestWorld) -> ServerStatus {
    world.manager.status().expect("status")
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a stopped server")]
fn given_stopped(world: &mut TestWorld) {
    assert_eq!(status(world), ServerStatus::Stopped);
}

#[given("a server running in the background")]
fn given_running(world: &mut TestWorld) {
    let record = world.manager.start_in_background().expect("start server");
    world.first_pid = Some(record.pid);
}

#[given("a stale server record")]
fn given_stale_record(world: &mut TestWorld) {
    let store = store_in(&world.dir);
    let mut guard = store.lock().expect("lock state");
    guard.state_mut().server = Some(ServerProcessRecord {
        pid: dead_pid(),
        started_at: 1,
        backgrounded: true,
    });
    guard.commit().expect("commit state");
}

#[given("a server command that exits immediately")]
fn given_failing_command(world: &mut TestWorld) {
    let dir = TempDir::new().expect("temp dir");
    *world = TestWorld::with_command(dir, "false", false);
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the server is started in the background")]
fn when_started(world: &mut TestWorld) {
    world.result = Some(
        world
            .manager
            .start_in_background()
            .map(|record| Some(record.pid)),
    );
}

#[when("the server is stopped")]
fn when_stopped(world: &mut TestWorld) {
    world.result = Some(world.manager.stop().map(|record| Some(record.pid)));
}

#[when("the server is restarted in the background")]
fn when_restarted(world: &mut TestWorld) {
    world.result = Some(
        world
            .manager
            .restart(StartMode::Background)
            .map(|outcome| match outcome {
                StartOutcome::Background(record) => Some(record.pid),
                StartOutcome::Foreground(_) => None,
            }),
    );
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the lifecycle operation succeeds")]
fn then_succeeds(world: &mut TestWorld) {
    let result = world.result.as_ref().expect("no operation ran");
    assert!(result.is_ok(), "expected success, got {result:?}");
}

#[then("the lifecycle operation fails with {kind}")]
fn then_fails_with(world: &mut TestWorld, kind: String) {
    let error = world
        .result
        .as_ref()
        .expect("no operation ran")
        .as_ref()
        .expect_err("expected failure but got success");
    let matched = match kind.trim_matches('"') {
        "already_running" => matches!(error, LifecycleError::AlreadyRunning { .. }),
        "not_running" => matches!(error, LifecycleError::NotRunning),
        "exited_early" => matches!(error, LifecycleError::ExitedEarly { .. }),
        other => panic!("unsupported error kind: '{other}'"),
    };
    assert!(matched, "unexpected error: {error}");
}

#[then("the server is reported as running")]
fn then_running(world: &mut TestWorld) {
    assert!(matches!(status(world), ServerStatus::Running(_)));
}

#[then("the server is reported as stopped")]
fn then_stopped(world: &mut TestWorld) {
    assert_eq!(status(world), ServerStatus::Stopped);
}

#[then("a different server is running")]
fn then_different_server(world: &mut TestWorld) {
    let ServerStatus::Running(record) = status(world) else {
        panic!("expected a running server");
    };
    assert_ne!(Some(record.pid), world.first_pid);
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/server_lifecycle.feature")]
fn server_lifecycle_behaviour(world: TestWorld) {
    let _ = world;
}
