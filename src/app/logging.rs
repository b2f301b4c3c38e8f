//! Logging configuration and initialization

use crate::app::config::AppConfig;
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the application
///
/// `RUST_LOG` wins over the verbosity-derived level when it is set. Logs go
/// to stderr so that replayed child stdout stays clean.
pub fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(config.verbose >= 2 || config.live_output)
        .with_thread_ids(config.verbose >= 3)
        .with_line_number(config.verbose >= 3)
        .init();

    debug!("procdrain started with verbosity level: {}", config.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
}
