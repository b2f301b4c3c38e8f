use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::command::Command;
use super::error::ProcessError;
use super::output::CapturedResult;
use super::runner::{ProcessRunner, TokioProcessRunner};

/// Scripted [`ProcessRunner`] for callers that orchestrate commands.
///
/// Responses go through the same exit-code translation as the real
/// runner, so a scripted non-zero exit surfaces as
/// [`ProcessError::CommandFailed`].
#[derive(Clone)]
pub struct MockProcessRunner {
    expectations: Arc<Mutex<Vec<MockExpectation>>>,
    call_history: Arc<Mutex<Vec<Command>>>,
}

struct MockExpectation {
    program: String,
    #[allow(clippy::type_complexity)]
    args_matcher: Option<Box<dyn Fn(&[String]) -> bool + Send + Sync>>,
    response: MockResponse,
    times_called: usize,
    expected_times: Option<usize>,
}

#[derive(Clone)]
struct MockResponse {
    exit_code: i32,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    spawn_error: Option<std::io::ErrorKind>,
}

pub struct MockCommandConfig {
    runner: MockProcessRunner,
    expectation: MockExpectation,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(Vec::new())),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn expect_command(&mut self, program: &str) -> MockCommandConfig {
        MockCommandConfig {
            runner: self.clone(),
            expectation: MockExpectation {
                program: program.to_string(),
                args_matcher: None,
                response: MockResponse {
                    exit_code: 0,
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                    spawn_error: None,
                },
                times_called: 0,
                expected_times: None,
            },
        }
    }

    pub fn verify_called(&self, program: &str, times: usize) -> bool {
        let history = lock(&self.call_history);
        let count = history
            .iter()
            .filter(|cmd| cmd.program() == program)
            .count();
        count == times
    }

    pub fn get_call_history(&self) -> Vec<Command> {
        lock(&self.call_history).clone()
    }

    pub fn reset(&mut self) {
        lock(&self.expectations).clear();
        lock(&self.call_history).clear();
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: Command) -> Result<CapturedResult, ProcessError> {
        lock(&self.call_history).push(command.clone());

        let response = {
            let mut expectations = lock(&self.expectations);
            let mut matched = None;

            for expectation in expectations.iter_mut() {
                if expectation.program != command.program() {
                    continue;
                }

                if let Some(ref args_matcher) = expectation.args_matcher {
                    if !(args_matcher)(command.arguments()) {
                        continue;
                    }
                }

                expectation.times_called += 1;

                if let Some(expected) = expectation.expected_times {
                    if expectation.times_called > expected {
                        return Err(ProcessError::MockExpectationNotMet(format!(
                            "Command '{}' called {} times, expected {}",
                            command.program(),
                            expectation.times_called,
                            expected
                        )));
                    }
                }

                matched = Some(expectation.response.clone());
                break;
            }

            matched.ok_or_else(|| {
                ProcessError::MockExpectationNotMet(format!(
                    "No expectation found for command: {}",
                    command.display()
                ))
            })?
        };

        if let Some(kind) = response.spawn_error {
            return Err(ProcessError::Spawn {
                args: command.into_args(),
                source: std::io::Error::from(kind),
            });
        }

        TokioProcessRunner::translate(
            command.into_args(),
            response.exit_code,
            response.stdout,
            response.stderr,
            Duration::from_millis(10),
        )
    }
}

impl MockCommandConfig {
    /// Match on the arguments after the program name.
    pub fn with_args<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.expectation.args_matcher = Some(Box::new(matcher));
        self
    }

    pub fn returns_stdout(mut self, stdout: impl AsRef<[u8]>) -> Self {
        self.expectation.response.stdout = stdout.as_ref().to_vec();
        self
    }

    pub fn returns_stderr(mut self, stderr: impl AsRef<[u8]>) -> Self {
        self.expectation.response.stderr = stderr.as_ref().to_vec();
        self
    }

    pub fn returns_exit_code(mut self, code: i32) -> Self {
        self.expectation.response.exit_code = code;
        self
    }

    pub fn returns_success(mut self) -> Self {
        self.expectation.response.exit_code = 0;
        self
    }

    /// Fail as if the program could not be started.
    pub fn fails_to_spawn(mut self, kind: std::io::ErrorKind) -> Self {
        self.expectation.response.spawn_error = Some(kind);
        self
    }

    pub fn times(mut self, n: usize) -> Self {
        self.expectation.expected_times = Some(n);
        self
    }

    pub fn finish(self) {
        lock(&self.runner.expectations).push(self.expectation);
    }
}

impl Default for MockProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}
