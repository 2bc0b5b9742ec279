//! In-process tests for the CLI runner.

use std::ffi::OsString;
use std::process::ExitCode;

use corsica_config::Config;
use rstest::rstest;

use super::*;

mod support;

use support::{Sandbox, StaticConfigLoader, run_in};

/// Loads a configuration file that cannot be parsed.
struct FailingConfigLoader {
    dir: tempfile::TempDir,
}

impl FailingConfigLoader {
    fn new() -> Self {
        let dir = tempfile::TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("corsica.toml"), "server_port = not_a_number\n")
            .expect("write malformed config");
        Self { dir }
    }
}

impl ConfigLoader for FailingConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        let args = vec![
            OsString::from("corsica"),
            OsString::from("--config-path"),
            self.dir.path().join("corsica.toml").into_os_string(),
        ];
        OrthoConfigLoader.load(&args)
    }
}

fn run_with(loader: &impl ConfigLoader, args: &[&str]) -> (ExitCode, String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = run_with_loader(
        args.iter().map(OsString::from),
        &mut stdout,
        &mut stderr,
        loader,
    );
    (
        exit,
        String::from_utf8(stdout).expect("stdout utf8"),
        String::from_utf8(stderr).expect("stderr utf8"),
    )
}

#[test]
fn bare_invocation_prints_help() {
    let (exit, stdout, stderr) = run_with(&FailingConfigLoader::new(), &["corsica"]);
    assert_eq!(exit, ExitCode::SUCCESS);
    assert!(stdout.contains("Usage: corsica"), "help expected: {stdout}");
    assert!(stderr.is_empty(), "configuration is not loaded: {stderr}");
}

#[rstest]
#[case::help("--help", "Usage: corsica")]
#[case::version("--version", env!("CARGO_PKG_VERSION"))]
fn help_and_version_go_to_stdout(#[case] flag: &str, #[case] expected: &str) {
    let (exit, stdout, stderr) = run_with(&FailingConfigLoader::new(), &["corsica", flag]);
    assert_eq!(exit, ExitCode::SUCCESS);
    assert!(stdout.contains(expected), "unexpected stdout: {stdout}");
    assert!(stderr.is_empty());
}

#[test]
fn unknown_commands_are_usage_errors() {
    let (exit, _, stderr) = run_with(&FailingConfigLoader::new(), &["corsica", "launch"]);
    assert_eq!(exit, ExitCode::from(2));
    assert!(stderr.contains("unrecognized subcommand"), "stderr: {stderr}");
    assert!(!stderr.contains("Something went wrong!"));
}

#[test]
fn configuration_failures_are_reported() {
    let (exit, _, stderr) = run_with(
        &FailingConfigLoader::new(),
        &["corsica", "--server-port", "seventy", "status"],
    );
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stderr.contains("Something went wrong!"));
    assert!(stderr.contains("Command run: corsica --server-port seventy status"));
    assert!(stderr.contains("failed to load configuration"));
}

#[test]
fn configuration_flags_reach_the_loader() {
    struct RecordingLoader(std::cell::RefCell<Vec<OsString>>, Config);

    impl ConfigLoader for RecordingLoader {
        fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
            self.0.replace(args.to_vec());
            Ok(self.1.clone())
        }
    }

    let sandbox = Sandbox::provisioned();
    let loader = RecordingLoader(std::cell::RefCell::default(), sandbox.config());
    let (exit, stdout, _) = run_with(
        &loader,
        &["corsica", "--log-format", "compact", "list-plugins"],
    );
    assert_eq!(exit, ExitCode::SUCCESS);
    assert_eq!(
        loader.0.into_inner(),
        vec![
            OsString::from("corsica"),
            OsString::from("--log-format"),
            OsString::from("compact"),
        ]
    );
    assert!(stdout.contains("No plugins installed."));
}

#[test]
fn invalid_log_filter_is_reported() {
    let sandbox = Sandbox::provisioned();
    let config = Config {
        log_filter: Some("corsica=loud".to_owned()),
        ..sandbox.config()
    };
    let (exit, _, stderr) = run_with(&StaticConfigLoader::new(config), &["corsica", "status"]);
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stderr.contains("invalid log filter"), "stderr: {stderr}");
}

#[test]
fn status_of_a_fresh_installation_is_stopped() {
    let sandbox = Sandbox::provisioned();
    let (exit, stdout, _) = run_in(&sandbox, "status");
    assert_eq!(exit, ExitCode::SUCCESS);
    assert_eq!(stdout, "The server is not running.\n");
}

#[test]
fn update_refreshes_the_installation() {
    let sandbox = Sandbox::provisioned();
    let (exit, stdout, _) = run_in(&sandbox, "update");
    assert_eq!(exit, ExitCode::SUCCESS);
    assert_eq!(stdout, "Done!\n");
    let log = sandbox.package_manager_log();
    assert!(log.contains("update"), "package manager log: {log}");
}

#[test]
fn foreground_start_announces_ctrl_c_once_launched() {
    let sandbox = Sandbox::provisioned();
    let config = Config {
        server_command: Some("true".to_owned()),
        ..sandbox.config()
    };
    let (exit, stdout, _) = run_with(&StaticConfigLoader::new(config), &["corsica", "start"]);
    assert_eq!(exit, ExitCode::SUCCESS);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.first(), Some(&"Press Ctrl+C to exit."), "stdout: {stdout}");
    assert!(lines.get(1).is_some_and(|line| line.ends_with("exited.")), "stdout: {stdout}");
    assert_eq!(lines.last(), Some(&"Done!"));
}

#[rstest]
#[case::start("start")]
#[case::restart("restart")]
fn failed_foreground_launch_does_not_announce_ctrl_c(#[case] command: &str) {
    let sandbox = Sandbox::provisioned();
    let config = Config {
        server_command: Some("corsica-test-no-such-server".to_owned()),
        ..sandbox.config()
    };
    let (exit, stdout, stderr) = run_with(&StaticConfigLoader::new(config), &["corsica", command]);
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(!stdout.contains("Ctrl+C"), "stdout: {stdout}");
    assert!(stderr.contains("Something went wrong!"), "stderr: {stderr}");
}

#[test]
fn refused_foreground_start_does_not_announce_ctrl_c() {
    let mut sandbox = Sandbox::provisioned();
    sandbox.reserve_port();
    let (started, _, _) = run_in(&sandbox, "start --background");
    assert_eq!(started, ExitCode::SUCCESS);

    let (exit, stdout, stderr) = run_in(&sandbox, "start");
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(!stdout.contains("Ctrl+C"), "stdout: {stdout}");
    assert!(stderr.contains("already running"), "stderr: {stderr}");

    let (stopped, _, _) = run_in(&sandbox, "stop");
    assert_eq!(stopped, ExitCode::SUCCESS);
}
