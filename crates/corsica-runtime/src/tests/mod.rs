//! Crate-level integration and BDD tests.

pub(crate) mod support;

mod lifecycle_behaviour;

use tempfile::TempDir;

use crate::lifecycle::{LifecycleManager, ServerCommand, ServerStatus};
use crate::plugins::PluginManager;

use support::{FakePackageManager, FixedProbe, config_for, fast_timings, store_in};

#[test]
fn plugins_and_server_share_one_state_document() {
    let dir = TempDir::new().expect("temp dir");
    let config = config_for(dir.path());
    let plugins = PluginManager::from_config(&config, FakePackageManager::default())
        .expect("plugin manager");
    plugins.install("corsica-chat").expect("install plugin");

    let mut lifecycle = LifecycleManager::new(
        store_in(&dir),
        ServerCommand::parse("sleep 30").expect("command"),
        FixedProbe(true),
        fast_timings(),
    );
    let record = lifecycle.start_in_background().expect("start server");

    let state = store_in(&dir).load().expect("load state");
    assert_eq!(state.server.as_ref().map(|server| server.pid), Some(record.pid));
    assert!(state.plugins.contains_key("corsica-chat"));

    lifecycle.stop().expect("stop server");
    assert_eq!(lifecycle.status().expect("status"), ServerStatus::Stopped);
    let names: Vec<String> = plugins
        .list()
        .expect("list plugins")
        .map(|plugin| plugin.name)
        .collect();
    assert_eq!(names, ["corsica-chat"]);
}
