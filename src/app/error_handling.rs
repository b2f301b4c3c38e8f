//! Error handling utilities

use tracing::error;

/// Exit status used when procdrain itself fails before or around a run.
pub const GENERAL_ERROR: i32 = 1;
/// Exit status for a configuration problem.
pub const CONFIG_ERROR: i32 = 78;

/// Report a fatal error and exit
///
/// - `verbose = 0`: the error and its causes on one line
/// - `verbose >= 1`: the full cause chain, one entry per line
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {:#}", error);

    if verbose >= 1 {
        eprintln!("Error: {}", error);
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    } else {
        eprintln!("Error: {:#}", error);
    }

    std::process::exit(exit_code_for(&error))
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    let is_config = error
        .chain()
        .any(|cause| cause.downcast_ref::<crate::config::ConfigError>().is_some());
    if is_config {
        CONFIG_ERROR
    } else {
        GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use anyhow::Context;

    #[test]
    fn test_config_errors_get_their_own_exit_code() {
        let err: anyhow::Result<()> =
            Err(ConfigError::Invalid("chunk_size must be greater than zero".into()))
                .context("Invalid runner configuration");
        assert_eq!(exit_code_for(&err.unwrap_err()), CONFIG_ERROR);
    }

    #[test]
    fn test_other_errors_are_general() {
        let err = anyhow::anyhow!("stdout closed");
        assert_eq!(exit_code_for(&err), GENERAL_ERROR);
    }
}
