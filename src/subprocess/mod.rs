//! Subprocess execution with concurrent output draining.
//!
//! A [`Command`] is spawned as a [`RunningProcess`], its stdout and stderr
//! are drained together by the [`multiplexer`], each stream is captured in
//! full and optionally split into lines for a [`LineSink`], and the
//! [`ProcessRunner`] turns the reaped exit code into a [`CapturedResult`]
//! or a [`ProcessError`].

pub mod builder;
pub mod command;
pub mod decode;
pub mod error;
pub mod line_buffer;
pub mod mock;
pub mod multiplexer;
pub mod output;
pub mod process;
pub mod runner;
pub mod sink;

pub use builder::CommandBuilder;
pub use command::{CaptureMode, Command};
pub use decode::safe_decode;
pub use error::{CleanupError, ProcessError};
pub use line_buffer::{LineBuffer, StreamCapture};
pub use mock::{MockCommandConfig, MockProcessRunner};
pub use output::{tail_lines, CapturedResult, StreamSource};
pub use process::{ChildHandle, RunningProcess};
pub use runner::{ProcessRunner, TokioProcessRunner};
pub use sink::{CollectingSink, LineSink, TracingSink};

use std::sync::Arc;

use crate::config::RunnerConfig;

/// Shared handle to a [`ProcessRunner`], cheap to clone into callers.
#[derive(Clone)]
pub struct SubprocessManager {
    runner: Arc<dyn ProcessRunner>,
}

impl SubprocessManager {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    pub fn production(config: RunnerConfig) -> Self {
        Self::new(Arc::new(TokioProcessRunner::new(config)))
    }

    pub fn mock() -> (Self, MockProcessRunner) {
        let mock = MockProcessRunner::new();
        let runner = Arc::new(mock.clone()) as Arc<dyn ProcessRunner>;
        (Self::new(runner), mock)
    }

    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }

    /// Run `command`, returning its output or a structured failure.
    pub async fn run(&self, command: Command) -> Result<CapturedResult, ProcessError> {
        self.runner.run(command).await
    }
}
