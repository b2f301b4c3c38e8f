//! Results of a finished command.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::decode::safe_decode;

/// Stream source identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    Stdout,
    Stderr,
}

impl StreamSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamSource::Stdout => "stdout",
            StreamSource::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command that exited with status zero.
///
/// Only built after both streams reached end-of-stream and the child was
/// reaped. When the command ran with output discarded, `stdout` and
/// `stderr` are empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResult {
    pub args: Vec<String>,
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
}

impl CapturedResult {
    pub fn stdout_text(&self) -> Cow<'_, str> {
        safe_decode(&self.stdout)
    }

    pub fn stderr_text(&self) -> Cow<'_, str> {
        safe_decode(&self.stderr)
    }
}

/// Decode `bytes` and keep the last `n` lines, without a trailing newline.
pub fn tail_lines(bytes: &[u8], n: usize) -> String {
    let text = safe_decode(bytes);
    let trimmed = text.trim_end_matches('\n');
    if trimmed.is_empty() || n == 0 {
        return String::new();
    }

    let lines: Vec<&str> = trimmed.split('\n').collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_lines() {
        assert_eq!(tail_lines(b"a\nb\nc\n", 2), "b\nc");
        assert_eq!(tail_lines(b"a\nb\nc", 5), "a\nb\nc");
        assert_eq!(tail_lines(b"", 3), "");
        assert_eq!(tail_lines(b"\n\n", 3), "");
        assert_eq!(tail_lines(b"only", 0), "");
    }

    #[test]
    fn test_tail_lines_escapes_invalid_bytes() {
        assert_eq!(tail_lines(b"ok\n\xffbad\n", 1), "\\xffbad");
    }

    #[test]
    fn test_text_accessors() {
        let result = CapturedResult {
            args: vec!["echo".into(), "hello".into()],
            exit_code: 0,
            stdout: b"hello\n".to_vec(),
            stderr: b"\xfe".to_vec(),
            duration: Duration::from_millis(3),
        };
        assert_eq!(result.stdout_text(), "hello\n");
        assert_eq!(result.stderr_text(), "\\xfe");
    }

    #[test]
    fn test_stream_source_display() {
        assert_eq!(StreamSource::Stdout.to_string(), "stdout");
        assert_eq!(
            serde_json::to_string(&StreamSource::Stderr).unwrap(),
            "\"stderr\""
        );
    }
}
