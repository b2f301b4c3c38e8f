use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncRead;

use super::command::Command;
use super::error::ProcessError;
use super::line_buffer::StreamCapture;
use super::multiplexer::{self, DrainError};
use super::output::{CapturedResult, StreamSource};
use super::process::{ChildHandle, RunningProcess};
use super::sink::{LineSink, TracingSink};
use crate::config::RunnerConfig;

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `command` to completion.
    ///
    /// A non-zero exit is returned as [`ProcessError::CommandFailed`] with
    /// the full captured output.
    async fn run(&self, command: Command) -> Result<CapturedResult, ProcessError>;
}

/// Why an invocation stopped before the child's exit code was known.
#[derive(Debug)]
enum Interruption {
    Drain(DrainError),
    Wait(std::io::Error),
    TimedOut(Duration),
}

impl Interruption {
    fn into_error(
        self,
        command: &Command,
        stdout: StreamCapture,
        stderr: StreamCapture,
    ) -> ProcessError {
        let args = command.args().to_vec();
        match self {
            Interruption::Drain(DrainError::Read { source, .. }) => {
                ProcessError::Io { args, source }
            }
            Interruption::Drain(DrainError::Overflow(overflow)) => {
                ProcessError::CaptureLimitExceeded {
                    args,
                    stream: overflow.stream,
                    max_bytes: overflow.max_bytes,
                }
            }
            Interruption::Wait(source) => ProcessError::Io { args, source },
            Interruption::TimedOut(timeout) => ProcessError::Timeout {
                args,
                timeout,
                stdout: stdout.into_bytes(),
                stderr: stderr.into_bytes(),
            },
        }
    }
}

/// Production runner backed by `tokio::process`.
#[derive(Clone, Default)]
pub struct TokioProcessRunner {
    config: RunnerConfig,
    sink: Option<Arc<dyn LineSink>>,
}

impl TokioProcessRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config, sink: None }
    }

    /// Send live-logged lines to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: Arc<dyn LineSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Log command execution details
    fn log_command_start(command: &Command) {
        tracing::debug!("Executing subprocess: {}", command.display());

        if let Some(env) = command.env() {
            tracing::debug!("Environment overrides: {}", env.len());
            tracing::trace!("Environment overrides: {:?}", env);
        }

        if let Some(dir) = command.working_dir() {
            tracing::trace!("Working directory: {:?}", dir);
        }
    }

    /// Log the process execution result
    fn log_result(result: &Result<CapturedResult, ProcessError>, duration: Duration) {
        match result {
            Ok(output) => {
                tracing::debug!(
                    "Subprocess completed successfully in {:?}: {}",
                    duration,
                    shell_words::join(&output.args)
                );
                tracing::trace!("Stdout length: {} bytes", output.stdout.len());
                tracing::trace!("Stderr length: {} bytes", output.stderr.len());
            }
            Err(ProcessError::CommandFailed {
                args,
                exit_code,
                stderr,
                ..
            }) => {
                tracing::debug!(
                    "Subprocess failed with exit code {} in {:?}: {}",
                    exit_code,
                    duration,
                    shell_words::join(args)
                );
                tracing::trace!("Stderr length: {} bytes", stderr.len());
            }
            Err(e) => tracing::warn!("Subprocess did not complete after {:?}: {}", duration, e),
        }
    }

    /// Drive a spawned process to completion over the given output readers.
    ///
    /// On any interruption the process is shut down (terminate, bounded
    /// wait, kill) before the original error is returned. Failures during
    /// that shutdown are logged and never replace the original error.
    pub async fn execute<P, O, E>(
        &self,
        command: &Command,
        mut process: P,
        streams: Option<(O, E)>,
    ) -> Result<CapturedResult, ProcessError>
    where
        P: ChildHandle,
        O: AsyncRead + Unpin + Send,
        E: AsyncRead + Unpin + Send,
    {
        let start = Instant::now();
        let limit = self.config.capture_limit;
        let live = command.log_output_live();
        let mut stdout = StreamCapture::new(StreamSource::Stdout, live, limit);
        let mut stderr = StreamCapture::new(StreamSource::Stderr, live, limit);
        let sink: Arc<dyn LineSink> = match &self.sink {
            Some(sink) => Arc::clone(sink),
            None => Arc::new(TracingSink::new(process.pid())),
        };

        let completion = Self::complete(
            &mut process,
            streams,
            &mut stdout,
            &mut stderr,
            sink.as_ref(),
            self.config.chunk_size,
        );
        let outcome = match command.timeout() {
            Some(timeout) => tokio::time::timeout(timeout, completion)
                .await
                .unwrap_or(Err(Interruption::TimedOut(timeout))),
            None => completion.await,
        };

        match outcome {
            Ok(exit_code) => Self::translate(
                command.args().to_vec(),
                exit_code,
                stdout.into_bytes(),
                stderr.into_bytes(),
                start.elapsed(),
            ),
            Err(interruption) => {
                tracing::debug!(
                    "Interrupted while running {}: {:?}",
                    command.display(),
                    interruption
                );
                if let Err(cleanup) = process.shutdown(self.config.grace_period).await {
                    tracing::error!(
                        "Cleanup of process {:?} failed: {}",
                        process.pid(),
                        cleanup
                    );
                }
                Err(interruption.into_error(command, stdout, stderr))
            }
        }
    }

    async fn complete<P, O, E>(
        process: &mut P,
        streams: Option<(O, E)>,
        stdout: &mut StreamCapture,
        stderr: &mut StreamCapture,
        sink: &dyn LineSink,
        chunk_size: usize,
    ) -> Result<i32, Interruption>
    where
        P: ChildHandle,
        O: AsyncRead + Unpin,
        E: AsyncRead + Unpin,
    {
        if let Some((out, err)) = streams {
            multiplexer::drain(out, err, stdout, stderr, sink, chunk_size)
                .await
                .map_err(Interruption::Drain)?;
        }

        // Both pipes are closed, which usually means the child exited, but
        // its status is only known once it has been reaped.
        process.wait().await.map_err(Interruption::Wait)
    }

    /// Turn a reaped exit code and captured output into the final result.
    pub(crate) fn translate(
        args: Vec<String>,
        exit_code: i32,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        duration: Duration,
    ) -> Result<CapturedResult, ProcessError> {
        if exit_code == 0 {
            Ok(CapturedResult {
                args,
                exit_code,
                stdout,
                stderr,
                duration,
            })
        } else {
            Err(ProcessError::CommandFailed {
                args,
                exit_code,
                stdout,
                stderr,
            })
        }
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: Command) -> Result<CapturedResult, ProcessError> {
        let start = Instant::now();
        Self::log_command_start(&command);

        let mut process = RunningProcess::spawn(&command)?;
        let streams = process.take_streams();
        let result = self.execute(&command, process, streams).await;

        Self::log_result(&result, start.elapsed());
        result
    }
}
