//! The diagnostic report printed when a command fails.
//!
//! Every failure funnels through [`write_report`], so commands only ever
//! return errors and never format them.

use std::error::Error;
use std::ffi::OsString;
use std::io::{self, Write};

const HEADLINE: &str = "Something went wrong!";
const DETAILS_HINT: &str = "If you ask for help, be sure to provide the following details:";

/// Writes the failure report for `error` raised by the invocation `args`.
pub(crate) fn write_report<E: Write>(
    stderr: &mut E,
    error: &(dyn Error + 'static),
    args: &[OsString],
) -> io::Result<()> {
    writeln!(stderr, "{HEADLINE}")?;
    writeln!(stderr, "{DETAILS_HINT}")?;
    writeln!(stderr, "  CLI version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(stderr, "  Command run: {}", command_line(args))?;
    writeln!(stderr, "  Error: {error}")?;
    for cause in distinct_causes(error) {
        writeln!(stderr, "  Caused by: {cause}")?;
    }
    stderr.flush()
}

fn command_line(args: &[OsString]) -> String {
    args.iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Source messages not already spelled out by the message above them.
fn distinct_causes(error: &(dyn Error + 'static)) -> Vec<String> {
    let mut causes = Vec::new();
    let mut previous = error.to_string();
    let mut current = error.source();
    while let Some(cause) = current {
        let message = cause.to_string();
        if !previous.contains(&message) {
            causes.push(message.clone());
        }
        previous = message;
        current = cause.source();
    }
    causes
}
