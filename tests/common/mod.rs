//! Shared helpers for integration tests

use procdrain::config::RunnerConfig;
use procdrain::subprocess::{Command, CommandBuilder, TokioProcessRunner};
use std::time::Duration;

/// Upper bound for any single child run; a hang fails the test instead of the suite.
pub const RUN_DEADLINE: Duration = Duration::from_secs(60);

pub fn sh(script: &str) -> Command {
    CommandBuilder::new("sh")
        .args(["-c", script])
        .build()
        .expect("valid command")
}

pub fn runner() -> TokioProcessRunner {
    TokioProcessRunner::new(RunnerConfig::default())
}
