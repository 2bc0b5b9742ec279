//! Sandboxed installations for driving the runner in-process.

use std::ffi::OsString;
use std::fs;
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use corsica_config::Config;
use tempfile::TempDir;

use crate::{AppError, ConfigLoader, run_with_loader};

/// Package manager stand-in: logs its arguments, creates or deletes the
/// package directory, and fails for packages named `broken-*`.
const FAKE_PACKAGE_MANAGER: &str = r#"#!/bin/sh
echo "$*" >> "$(dirname "$0")/package-manager.log"
verb="$1"
prefix="$3"
package="$4"
case "$package" in
  broken-*) echo "404 Not Found - $package" >&2; exit 1 ;;
esac
case "$verb" in
  install) mkdir -p "$prefix/node_modules/$package" ;;
  uninstall) rm -rf "$prefix/node_modules/$package" ;;
esac
"#;

pub(crate) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(crate) const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// A temporary directory holding an install path and a fake package manager.
pub(crate) struct Sandbox {
    dir: TempDir,
    listener: Option<TcpListener>,
}

impl Sandbox {
    /// A sandbox whose install path has not been created.
    pub(crate) fn unprovisioned() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let script = dir.path().join("fake-npm");
        fs::write(&script, FAKE_PACKAGE_MANAGER).expect("write fake package manager");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755))
            .expect("make fake package manager executable");
        Self {
            dir,
            listener: None,
        }
    }

    /// A sandbox whose install path exists.
    pub(crate) fn provisioned() -> Self {
        let sandbox = Self::unprovisioned();
        fs::create_dir_all(sandbox.install_path()).expect("create install path");
        sandbox
    }

    pub(crate) fn install_path(&self) -> PathBuf {
        self.dir.path().join("install")
    }

    /// Holds a listening socket so readiness probes succeed.
    pub(crate) fn reserve_port(&mut self) {
        self.listener = Some(TcpListener::bind("127.0.0.1:0").expect("bind listener"));
    }

    pub(crate) fn config(&self) -> Config {
        let utf8 = |path: PathBuf| Utf8PathBuf::from_path_buf(path).expect("utf8 path");
        Config {
            install_path: Some(utf8(self.install_path())),
            package_manager: Some(utf8(self.dir.path().join("fake-npm")).into_string()),
            server_command: Some("sleep 30".to_owned()),
            server_port: self
                .listener
                .as_ref()
                .map(|listener| listener.local_addr().expect("listener address").port()),
            readiness_timeout_ms: Some(5_000),
            stop_grace_ms: Some(2_000),
            ..Config::default()
        }
    }

    pub(crate) fn package_manager_log(&self) -> String {
        fs::read_to_string(self.dir.path().join("package-manager.log")).unwrap_or_default()
    }
}

/// Runs `corsica <command line>` against the sandbox.
pub(crate) fn run_in(sandbox: &Sandbox, command_line: &str) -> (ExitCode, String, String) {
    let args = std::iter::once(OsString::from("corsica"))
        .chain(command_line.split_whitespace().map(OsString::from));
    let loader = StaticConfigLoader::new(sandbox.config());
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = run_with_loader(args, &mut stdout, &mut stderr, &loader);
    (
        exit,
        String::from_utf8(stdout).expect("stdout utf8"),
        String::from_utf8(stderr).expect("stderr utf8"),
    )
}
