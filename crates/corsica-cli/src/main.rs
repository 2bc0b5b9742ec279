//! Entry point for the `corsica` binary.
//!
//! All behaviour lives in [`corsica_cli::run`] so tests can drive it with
//! in-memory streams.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    corsica_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
