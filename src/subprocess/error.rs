use std::time::Duration;

use super::output::{tail_lines, StreamSource};

/// Number of stderr lines quoted in the `Display` of a failed command.
const STDERR_TAIL_LINES: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Failed to spawn `{}`: {source}", shell_words::join(.args))]
    Spawn {
        args: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Command `{}` exited with code {exit_code}{}",
        shell_words::join(.args),
        stderr_suffix(.stderr)
    )]
    CommandFailed {
        args: Vec<String>,
        exit_code: i32,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },

    #[error("IO error while running `{}`: {source}", shell_words::join(.args))]
    Io {
        args: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{}` timed out after {timeout:?}", shell_words::join(.args))]
    Timeout {
        args: Vec<String>,
        timeout: Duration,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },

    #[error(
        "{stream} of `{}` exceeded the capture limit of {max_bytes} bytes",
        shell_words::join(.args)
    )]
    CaptureLimitExceeded {
        args: Vec<String>,
        stream: StreamSource,
        max_bytes: usize,
    },

    #[error("Mock expectation not met: {0}")]
    MockExpectationNotMet(String),
}

impl ProcessError {
    /// Exit code of the child, when it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessError::CommandFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// Output captured before the error, as `(stdout, stderr)`.
    pub fn captured(&self) -> Option<(&[u8], &[u8])> {
        match self {
            ProcessError::CommandFailed { stdout, stderr, .. }
            | ProcessError::Timeout { stdout, stderr, .. } => Some((stdout, stderr)),
            _ => None,
        }
    }

    /// Argument vector of the command this error belongs to.
    pub fn args(&self) -> &[String] {
        match self {
            ProcessError::InvalidCommand(_) | ProcessError::MockExpectationNotMet(_) => &[],
            ProcessError::Spawn { args, .. }
            | ProcessError::CommandFailed { args, .. }
            | ProcessError::Io { args, .. }
            | ProcessError::Timeout { args, .. }
            | ProcessError::CaptureLimitExceeded { args, .. } => args,
        }
    }
}

fn stderr_suffix(stderr: &[u8]) -> String {
    let tail = tail_lines(stderr, STDERR_TAIL_LINES);
    if tail.is_empty() {
        String::new()
    } else {
        format!("\nstderr:\n{}", tail)
    }
}

/// Failure while tearing a process down after another error.
///
/// These are reported through `tracing` and never replace the error
/// that triggered the cleanup.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("Failed to send termination signal to process {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to kill process: {0}")]
    Kill(#[source] std::io::Error),

    #[error("Failed to reap process: {0}")]
    Reap(#[source] std::io::Error),
}
