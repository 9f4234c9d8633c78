//! External process abstraction layer
//!
//! Every interaction with git and the packaging toolchain goes through the
//! [CommandRunner] trait so the release workflow can be driven by a scripted
//! fake in tests.
//!
//! - [SystemRunner]: spawns real processes with `std::process::Command`
//! - [mock::MockRunner]: scripted outputs and exit codes, records every call
//!
//! A runner reports non-zero exits as data ([CommandOutput::exit_code]); it
//! only returns `Err` when the process could not be spawned at all. Use
//! [run_checked] to turn a non-zero exit into
//! [ReleaseError::ExternalToolFailure], and [try_run] for the rare
//! best-effort call whose failure is deliberately ignored.

pub mod mock;

pub use mock::MockRunner;

use crate::error::{ReleaseError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// A command line to run: program plus arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Create a command with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        ToolCommand {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Shorthand for a `git` subcommand
    pub fn git<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ToolCommand::new("git").args(args)
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Exit code and captured output of a finished command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub exit_code: i32,
    /// Stdout lines followed by stderr lines
    pub lines: Vec<String>,
}

impl CommandOutput {
    /// A successful run with the given stdout lines
    pub fn success<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandOutput {
            exit_code: 0,
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// A failed run with the given exit code and output
    pub fn failure<I, S>(exit_code: i32, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandOutput {
            exit_code,
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Capability to run external commands synchronously.
///
/// Calls block until the process exits. There is no timeout.
pub trait CommandRunner: Send + Sync {
    /// Run a command and capture its output.
    ///
    /// # Returns
    /// * `Ok(CommandOutput)` - The process ran; inspect `exit_code`
    /// * `Err` - The process could not be started
    fn run(&self, command: &ToolCommand) -> Result<CommandOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, command: &ToolCommand) -> Result<CommandOutput> {
        (**self).run(command)
    }
}

/// Run a command, treating a non-zero exit as [ReleaseError::ExternalToolFailure].
///
/// Returns the captured output lines on success.
pub fn run_checked<R: CommandRunner + ?Sized>(
    runner: &R,
    command: &ToolCommand,
) -> Result<Vec<String>> {
    debug!(command = %command, "running");
    let output = runner.run(command)?;

    if output.is_success() {
        Ok(output.lines)
    } else {
        Err(ReleaseError::ExternalToolFailure {
            command: command.to_string(),
            exit_code: output.exit_code,
            output: output.lines,
        })
    }
}

/// Best-effort variant of [run_checked].
///
/// Swallows only [ReleaseError::ExternalToolFailure] (logged as a warning) and
/// returns `Ok(false)` for it. Spawn failures and everything else propagate.
pub fn try_run<R: CommandRunner + ?Sized>(runner: &R, command: &ToolCommand) -> Result<bool> {
    match run_checked(runner, command) {
        Ok(_) => Ok(true),
        Err(ReleaseError::ExternalToolFailure { exit_code, .. }) => {
            warn!(command = %command, exit_code, "ignoring failure of best-effort command");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Runs commands as real child processes in a fixed working directory
#[derive(Debug, Clone)]
pub struct SystemRunner {
    working_dir: PathBuf,
}

impl SystemRunner {
    /// Create a runner executing in `working_dir`
    pub fn new<P: AsRef<Path>>(working_dir: P) -> Self {
        SystemRunner {
            working_dir: working_dir.as_ref().to_path_buf(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<CommandOutput> {
        let output = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&self.working_dir)
            .output()
            .map_err(|e| {
                ReleaseError::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to execute `{}`: {}", command, e),
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines = stdout
            .lines()
            .chain(stderr.lines())
            .map(|line| line.to_string())
            .collect();

        Ok(CommandOutput {
            // Killed by a signal: no code, report as generic failure
            exit_code: output.status.code().unwrap_or(-1),
            lines,
        })
    }
}
