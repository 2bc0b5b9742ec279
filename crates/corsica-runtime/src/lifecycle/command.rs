use std::path::Path;
use std::process::Command;

use super::error::LifecycleError;

/// Program and arguments that launch the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    program: String,
    args: Vec<String>,
}

impl ServerCommand {
    /// Builds a command from an explicit program and argument list.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits a configured command line on whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::EmptyServerCommand`] when no program remains.
    pub fn parse(command_line: &str) -> Result<Self, LifecycleError> {
        let mut words = command_line.split_whitespace().map(str::to_owned);
        let program = words.next().ok_or(LifecycleError::EmptyServerCommand)?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    /// Program name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments following the program.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub(super) fn to_command(&self, cwd: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).current_dir(cwd);
        command
    }
}
