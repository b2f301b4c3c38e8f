//! Destinations for live-logged output lines

use std::sync::{Mutex, PoisonError};

use super::output::StreamSource;

/// Tracing target used for forwarded child output.
pub const OUTPUT_TARGET: &str = "procdrain::output";

/// Receives decoded lines of child output as they complete.
pub trait LineSink: Send + Sync {
    /// Handle one line. The trailing newline has already been removed.
    fn line(&self, source: StreamSource, line: &str);
}

/// Forwards stdout lines at `debug` and stderr lines at `warn`.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    pid: Option<u32>,
}

impl TracingSink {
    pub fn new(pid: Option<u32>) -> Self {
        Self { pid }
    }
}

impl LineSink for TracingSink {
    fn line(&self, source: StreamSource, line: &str) {
        match source {
            StreamSource::Stdout => {
                tracing::debug!(target: OUTPUT_TARGET, pid = ?self.pid, "{}", line)
            }
            StreamSource::Stderr => {
                tracing::warn!(target: OUTPUT_TARGET, pid = ?self.pid, "{}", line)
            }
        }
    }
}

/// Keeps every line in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<(StreamSource, String)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines received so far.
    pub fn lines(&self) -> Vec<(StreamSource, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Lines received from one stream.
    pub fn lines_from(&self, source: StreamSource) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(from, _)| *from == source)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl LineSink for CollectingSink {
    fn line(&self, source: StreamSource, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((source, line.to_string()));
    }
}
