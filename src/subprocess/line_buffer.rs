//! Line reconstruction and full capture for one output stream.

use super::decode::safe_decode;
use super::output::StreamSource;
use super::sink::LineSink;
use crate::config::{CaptureLimit, OverflowStrategy};

/// Splits arbitrarily chunked bytes into `\n`-terminated lines.
///
/// Bytes after the last newline are held back until more data arrives or
/// [`LineBuffer::flush`] is called at end-of-stream.
#[derive(Debug, Default)]
pub struct LineBuffer {
    residue: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, newline removed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let previous_len = self.residue.len();
        self.residue.extend_from_slice(chunk);

        // Only the new bytes can contain a boundary the residue lacked.
        let Some(last_newline) = chunk.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let rest = self.residue.split_off(previous_len + last_newline + 1);
        let complete = std::mem::replace(&mut self.residue, rest);
        complete[..complete.len() - 1]
            .split(|&b| b == b'\n')
            .map(|line| safe_decode(line).into_owned())
            .collect()
    }

    /// Emit the unterminated residue, if any, exactly once.
    pub fn flush(&mut self) -> Option<String> {
        if self.residue.is_empty() {
            return None;
        }
        let residue = std::mem::take(&mut self.residue);
        Some(safe_decode(&residue).into_owned())
    }

    /// Bytes waiting for a newline.
    pub fn pending(&self) -> &[u8] {
        &self.residue
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{stream} exceeded the capture limit of {max_bytes} bytes")]
pub struct CaptureOverflow {
    pub stream: StreamSource,
    pub max_bytes: usize,
}

/// Everything recorded for one stream during a single invocation.
#[derive(Debug)]
pub struct StreamCapture {
    source: StreamSource,
    bytes: Vec<u8>,
    lines: Option<LineBuffer>,
    limit: Option<CaptureLimit>,
    dropped: usize,
}

impl StreamCapture {
    /// `log_lines` enables line reconstruction for a live sink.
    pub fn new(source: StreamSource, log_lines: bool, limit: Option<CaptureLimit>) -> Self {
        Self {
            source,
            bytes: Vec::new(),
            lines: log_lines.then(LineBuffer::new),
            limit,
            dropped: 0,
        }
    }

    /// Record a chunk read from the stream and forward completed lines.
    pub fn record(&mut self, chunk: &[u8], sink: &dyn LineSink) -> Result<(), CaptureOverflow> {
        self.append(chunk)?;

        if let Some(lines) = self.lines.as_mut() {
            for line in lines.push(chunk) {
                sink.line(self.source, &line);
            }
        }
        Ok(())
    }

    /// End-of-stream: forward any unterminated final line.
    pub fn finish(&mut self, sink: &dyn LineSink) {
        if let Some(line) = self.lines.as_mut().and_then(LineBuffer::flush) {
            sink.line(self.source, &line);
        }
        if self.dropped > 0 {
            tracing::warn!(
                "Discarded {} bytes of {} beyond the capture limit",
                self.dropped,
                self.source
            );
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bytes discarded by [`OverflowStrategy::DropOldest`].
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn append(&mut self, chunk: &[u8]) -> Result<(), CaptureOverflow> {
        let Some(limit) = self.limit else {
            self.bytes.extend_from_slice(chunk);
            return Ok(());
        };

        let total = self.bytes.len() + chunk.len();
        if total <= limit.max_bytes {
            self.bytes.extend_from_slice(chunk);
            return Ok(());
        }

        match limit.strategy {
            OverflowStrategy::Fail => Err(CaptureOverflow {
                stream: self.source,
                max_bytes: limit.max_bytes,
            }),
            OverflowStrategy::DropOldest => {
                let excess = total - limit.max_bytes;
                if excess >= self.bytes.len() {
                    let skip = excess - self.bytes.len();
                    self.bytes.clear();
                    self.bytes.extend_from_slice(&chunk[skip..]);
                } else {
                    self.bytes.drain(..excess);
                    self.bytes.extend_from_slice(chunk);
                }
                self.dropped += excess;
                Ok(())
            }
        }
    }
}
