//! CLI argument structures

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Run external commands and capture their output
#[derive(Parser, Debug)]
#[command(name = "procdrain")]
#[command(about = "procdrain - Run a command, drain its output, report the result", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a command, draining stdout and stderr concurrently
    #[command(name = "run")]
    Run(RunArgs),

    /// Print the effective runner configuration
    #[command(name = "config")]
    Config {
        /// Runner configuration file (TOML)
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Working directory for the command
    #[arg(short = 'C', long = "cwd", value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Extra environment variable, merged over the inherited environment
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Let the command write straight to this terminal instead of capturing
    #[arg(long)]
    pub no_capture: bool,

    /// Log each output line as it arrives
    #[arg(long, conflicts_with = "no_capture")]
    pub live: bool,

    /// Stop the command after this long (e.g. "30s", "5m")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Runner configuration file (TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// How to report the result
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Program and arguments to run
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Replay captured stdout/stderr unchanged
    Text,
    /// A single JSON document describing the run
    Json,
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}
