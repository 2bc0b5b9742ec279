//! Built-in defaults applied when a configuration layer leaves a value unset.

use std::env;
use std::time::Duration;

use camino::Utf8PathBuf;
use dirs::data_dir;

use crate::logging::LogFormat;

/// Launch command used when none is configured.
pub const DEFAULT_SERVER_COMMAND: &str = "npx corsica";

/// Port the Corsica server listens on out of the box.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Plugin directory relative to the install path.
pub const DEFAULT_PLUGINS_DIR: &str = "plugins";

/// Package manager used for provisioning.
pub const DEFAULT_PACKAGE_MANAGER: &str = "npm";

/// Server package installed by `setup`.
pub const DEFAULT_SERVER_PACKAGE: &str = "corsica";

/// Default log filter expression used by the CLI.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Readiness budget for background starts.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(10);

/// Grace period before a forced kill.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);

/// Default log filter expression used by the CLI.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the CLI.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Computes the default install path: `<data dir>/corsica`.
///
/// Falls back to `./corsica` under the current directory when the platform
/// exposes no data directory or it is not valid UTF-8.
#[must_use]
pub fn default_install_path() -> Utf8PathBuf {
    let base = data_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .or_else(|| {
            env::current_dir()
                .ok()
                .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        })
        .unwrap_or_else(|| Utf8PathBuf::from("."));
    base.join("corsica")
}
