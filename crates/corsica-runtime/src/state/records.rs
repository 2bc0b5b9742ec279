use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The server process the CLI believes is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerProcessRecord {
    /// Operating system process identifier.
    pub pid: u32,
    /// Launch time in seconds since the Unix epoch.
    pub started_at: u64,
    /// Whether the server was detached into its own session and process group.
    #[serde(default)]
    pub backgrounded: bool,
}

/// A plugin installed through the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    /// Package name; unique within the state document.
    pub name: String,
    /// Directory the package manager placed the plugin in.
    pub install_path: PathBuf,
    /// Installation time in seconds since the Unix epoch.
    pub installed_at: u64,
}

/// Everything persisted between CLI invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeState {
    /// Running server, if one has been started and not yet stopped.
    #[serde(default)]
    pub server: Option<ServerProcessRecord>,
    /// Installed plugins keyed by name.
    #[serde(default)]
    pub plugins: BTreeMap<String, PluginRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_deserialises_to_default_state() {
        let state: RuntimeState = serde_json::from_str("{}").expect("parse empty state");
        assert_eq!(state, RuntimeState::default());
    }

    #[test]
    fn server_record_defaults_to_foreground() {
        let record: ServerProcessRecord =
            serde_json::from_str(r#"{"pid":42,"started_at":7}"#).expect("parse record");
        assert!(!record.backgrounded);
    }
}
