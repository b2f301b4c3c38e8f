//! Application configuration
//!
//! Settings that shape process-wide behaviour rather than a single run.

/// Application configuration structure
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Whether child output lines are logged as they arrive
    pub live_output: bool,
}

impl AppConfig {
    pub fn new(verbose: u8) -> Self {
        Self {
            verbose,
            live_output: false,
        }
    }

    pub fn with_live_output(mut self, enabled: bool) -> Self {
        self.live_output = enabled;
        self
    }

    /// Get the filter directives based on verbosity
    pub fn log_level(&self) -> String {
        let base = match self.verbose {
            0 => "warn",
            1 => "debug",
            2 => "trace",
            _ => "trace,tokio=debug,mio=debug",
        };
        if self.live_output && self.verbose == 0 {
            format!("{},{}=debug", base, crate::subprocess::sink::OUTPUT_TARGET)
        } else {
            base.to_string()
        }
    }
}
