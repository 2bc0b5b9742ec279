//! Configuration loading must fail loudly on malformed input.

use std::ffi::OsString;
use std::fs;

use corsica_config::Config;
use ortho_config::OrthoConfig;
use tempfile::TempDir;

#[test]
fn malformed_config_file_is_reported() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("corsica.toml");
    fs::write(&path, "server_port = not_a_number\n").expect("write malformed config");

    let args = vec![
        OsString::from("corsica"),
        OsString::from("--config-path"),
        path.clone().into_os_string(),
    ];

    let error = Config::load_from_iter(args).expect_err("loading must fail");
    assert!(
        !error.to_string().is_empty(),
        "error message should describe the failure"
    );
}

#[test]
fn out_of_range_port_is_rejected() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("corsica.toml");
    fs::write(&path, "server_port = 70000\n").expect("write config");

    let args = vec![
        OsString::from("corsica"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];

    assert!(Config::load_from_iter(args).is_err());
}

#[test]
fn valid_config_file_populates_fields() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("corsica.toml");
    fs::write(
        &path,
        "server_command = \"node server.js\"\nserver_port = 9090\nlog_format = \"json\"\n",
    )
    .expect("write config");

    let args = vec![
        OsString::from("corsica"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];

    let config = Config::load_from_iter(args).expect("config loads");
    assert_eq!(config.server_command(), "node server.js");
    assert_eq!(config.server_port(), 9090);
    assert_eq!(config.log_format(), corsica_config::LogFormat::Json);
}
