use colored::Colorize;
use std::io::{self, Write};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::args::{Argv, Invocation};
use crate::git::{Git, GitError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("git {command} exited with {}", exit_label(.code))]
    Failed { command: String, code: Option<i32> },

    #[error(transparent)]
    Git(GitError),

    #[error("Failed to write command: {0}")]
    Output(#[from] io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "a signal".to_string(),
    }
}

impl From<GitError> for RunError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::Failed { args, code } => RunError::Failed { command: args, code },
            other => RunError::Git(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Execute,
    /// Print every command instead of running it
    Noop,
}

/// Run the queued commands of `invocation` in order, then the invocation
/// itself. Stops at the first command that fails.
#[instrument(skip_all, fields(command = %invocation.command(), queued = invocation.queued().len()))]
pub fn execute(git: &Git, invocation: &Invocation, mode: Mode, out: &mut dyn Write) -> Result<(), RunError> {
    let primary = invocation.argv();
    for argv in invocation.queued().iter().chain(std::iter::once(&primary)) {
        match mode {
            Mode::Noop => echo(git, argv, out)?,
            Mode::Execute => {
                debug!(args = ?argv, "executing");
                git.run(argv)?;
            }
        }
    }
    Ok(())
}

fn echo(git: &Git, argv: &Argv, out: &mut dyn Write) -> io::Result<()> {
    let line: Vec<&str> = std::iter::once("git")
        .chain(git.global_flags().iter().map(String::as_str))
        .chain(argv.iter().map(String::as_str))
        .collect();
    writeln!(out, "{} {}", ">".dimmed(), line.join(" "))
}
