//! `procdrain run`: execute one command and report its outcome.

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::args::{OutputFormat, RunArgs};
use crate::cli::report;
use crate::config::RunnerConfig;
use crate::subprocess::{CaptureMode, Command, CommandBuilder, ProcessRunner, TokioProcessRunner};

/// Run the requested command and return the exit status for this process.
pub async fn run_command(args: RunArgs) -> Result<i32> {
    let config = load_config(args.config.as_deref())?;
    let format = args.format;
    let live = args.live;
    let command = build_command(&args)?;

    tracing::debug!("Running {}", command.display());
    let runner = TokioProcessRunner::new(config);
    let outcome = runner.run(command).await;

    match format {
        OutputFormat::Text => {
            let stdout = std::io::stdout();
            let stderr = std::io::stderr();
            report::write_text(&outcome, live, &mut stdout.lock(), &mut stderr.lock())
                .context("Failed to write command output")?;
        }
        OutputFormat::Json => {
            report::write_json(&outcome, &mut std::io::stdout().lock())?;
        }
    }

    Ok(report::exit_status(&outcome))
}

/// Load the runner config from `path`, or from the environment alone.
pub fn load_config(path: Option<&Path>) -> Result<RunnerConfig> {
    let config = match path {
        Some(path) => RunnerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => RunnerConfig::from_env().context("Invalid runner configuration")?,
    };
    Ok(config)
}

pub(crate) fn build_command(args: &RunArgs) -> Result<Command> {
    let (program, rest) = args
        .command
        .split_first()
        .context("No command given")?;

    let mut builder = CommandBuilder::new(program)
        .args(rest)
        .log_output_live(args.live)
        .capture(if args.no_capture {
            CaptureMode::Discarded
        } else {
            CaptureMode::Captured
        });

    if let Some(dir) = &args.cwd {
        builder = builder.current_dir(dir);
    }
    if !args.env.is_empty() {
        builder = builder.envs(args.env.iter().map(|(k, v)| (k, v)));
    }
    if let Some(timeout) = args.timeout {
        builder = builder.timeout(timeout);
    }

    Ok(builder.build()?)
}
