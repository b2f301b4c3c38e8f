//! Command routing and execution

use crate::cli::args::Commands;
use crate::cli::commands::*;
use anyhow::Result;

/// Execute a CLI command and return the exit status for this process
pub async fn execute_command(command: Commands) -> Result<i32> {
    match command {
        Commands::Run(args) => run_command(args).await,
        Commands::Config { config } => {
            run_config_command(config.as_deref())?;
            Ok(0)
        }
    }
}
