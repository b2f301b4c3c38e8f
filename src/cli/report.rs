//! Turning a run outcome into user-facing output and an exit status.

use serde::Serialize;
use std::io::{self, Write};

use crate::subprocess::{safe_decode, tail_lines, CapturedResult, ProcessError};

/// Lines of stderr shown when a command fails in text mode.
const STDERR_TAIL: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
    TimedOut,
    Error,
}

/// JSON view of a finished run.
#[derive(Debug, Serialize)]
pub struct Report {
    pub status: RunStatus,
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Report {
    pub fn from_outcome(outcome: &Result<CapturedResult, ProcessError>) -> Self {
        match outcome {
            Ok(result) => Self {
                status: RunStatus::Success,
                command: result.args.clone(),
                exit_code: Some(result.exit_code),
                stdout: Some(result.stdout_text().into_owned()),
                stderr: Some(result.stderr_text().into_owned()),
                duration_ms: Some(result.duration.as_millis() as u64),
                error: None,
            },
            Err(err) => {
                let status = match err {
                    ProcessError::CommandFailed { .. } => RunStatus::Failed,
                    ProcessError::Timeout { .. } => RunStatus::TimedOut,
                    _ => RunStatus::Error,
                };
                let (stdout, stderr) = match err.captured() {
                    Some((stdout, stderr)) => (
                        Some(safe_decode(stdout).into_owned()),
                        Some(safe_decode(stderr).into_owned()),
                    ),
                    None => (None, None),
                };
                Self {
                    status,
                    command: err.args().to_vec(),
                    exit_code: err.exit_code(),
                    stdout,
                    stderr,
                    duration_ms: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

/// Exit status for this process, derived from the child's outcome.
///
/// Follows shell conventions: the child's own code when it failed,
/// `128 + n` for death by signal `n`, 124 for a timeout, 127 when the
/// program was not found and 126 when it could not be started.
pub fn exit_status(outcome: &Result<CapturedResult, ProcessError>) -> i32 {
    match outcome {
        Ok(_) => 0,
        Err(ProcessError::CommandFailed { exit_code, .. }) => match *exit_code {
            code @ 1..=255 => code,
            code if code < 0 => 128 + code.saturating_neg().min(127),
            _ => 1,
        },
        Err(ProcessError::Timeout { .. }) => 124,
        Err(ProcessError::Spawn { source, .. }) if source.kind() == io::ErrorKind::NotFound => 127,
        Err(ProcessError::Spawn { .. }) => 126,
        Err(_) => 1,
    }
}

/// Replay captured output and describe any failure.
///
/// `stderr_logged` means stderr lines already went out through the live
/// log, so the raw stderr is not written a second time.
pub fn write_text<O: Write, E: Write>(
    outcome: &Result<CapturedResult, ProcessError>,
    stderr_logged: bool,
    out: &mut O,
    err: &mut E,
) -> io::Result<()> {
    match outcome {
        Ok(result) => {
            out.write_all(&result.stdout)?;
            if !stderr_logged {
                err.write_all(&result.stderr)?;
            }
        }
        Err(ProcessError::CommandFailed {
            args,
            exit_code,
            stdout,
            stderr,
        }) => {
            out.write_all(stdout)?;
            writeln!(
                err,
                "Error: `{}` exited with code {}",
                shell_words::join(args),
                exit_code
            )?;
            let tail = tail_lines(stderr, STDERR_TAIL);
            if !tail.is_empty() {
                writeln!(err, "{}", tail)?;
            }
        }
        Err(error) => {
            if let Some((stdout, stderr)) = error.captured() {
                out.write_all(stdout)?;
                if !stderr_logged {
                    err.write_all(stderr)?;
                }
            }
            writeln!(err, "Error: {}", error)?;
        }
    }
    out.flush()?;
    err.flush()
}

pub fn write_json<O: Write>(
    outcome: &Result<CapturedResult, ProcessError>,
    out: &mut O,
) -> anyhow::Result<()> {
    let report = Report::from_outcome(outcome);
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn success() -> Result<CapturedResult, ProcessError> {
        Ok(CapturedResult {
            args: vec!["echo".into(), "hello".into()],
            exit_code: 0,
            stdout: b"hello\n".to_vec(),
            stderr: Vec::new(),
            duration: Duration::from_millis(12),
        })
    }

    fn failed(exit_code: i32) -> Result<CapturedResult, ProcessError> {
        Err(ProcessError::CommandFailed {
            args: vec!["docker".into(), "pull".into(), "nope".into()],
            exit_code,
            stdout: b"partial\n".to_vec(),
            stderr: b"Error response from daemon\n".to_vec(),
        })
    }

    #[test]
    fn test_exit_status_mapping() {
        assert_eq!(exit_status(&success()), 0);
        assert_eq!(exit_status(&failed(2)), 2);
        assert_eq!(exit_status(&failed(-9)), 137);
        assert_eq!(exit_status(&failed(300)), 1);

        let not_found = Err(ProcessError::Spawn {
            args: vec!["nope".into()],
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        assert_eq!(exit_status(&not_found), 127);

        let denied = Err(ProcessError::Spawn {
            args: vec!["./script".into()],
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        });
        assert_eq!(exit_status(&denied), 126);

        let timed_out = Err(ProcessError::Timeout {
            args: vec!["sleep".into()],
            timeout: Duration::from_secs(1),
            stdout: Vec::new(),
            stderr: Vec::new(),
        });
        assert_eq!(exit_status(&timed_out), 124);
    }

    #[test]
    fn test_write_text_success_replays_output() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        write_text(&success(), false, &mut out, &mut err).unwrap();
        assert_eq!(out, b"hello\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_write_text_failure_shows_stderr_tail() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        write_text(&failed(2), false, &mut out, &mut err).unwrap();

        assert_eq!(out, b"partial\n");
        let err = String::from_utf8(err).unwrap();
        assert_eq!(
            err,
            "Error: `docker pull nope` exited with code 2\nError response from daemon\n"
        );
    }

    #[test]
    fn test_write_text_skips_live_logged_stderr() {
        let outcome = Ok(CapturedResult {
            args: vec!["sh".into()],
            exit_code: 0,
            stdout: b"out\n".to_vec(),
            stderr: b"already logged\n".to_vec(),
            duration: Duration::ZERO,
        });
        let mut out = Vec::new();
        let mut err = Vec::new();
        write_text(&outcome, true, &mut out, &mut err).unwrap();

        assert_eq!(out, b"out\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_write_text_timeout_replays_partial_output() {
        let outcome = Err(ProcessError::Timeout {
            args: vec!["sleep".into(), "30".into()],
            timeout: Duration::from_millis(200),
            stdout: b"started\n".to_vec(),
            stderr: b"warming up\n".to_vec(),
        });
        let mut out = Vec::new();
        let mut err = Vec::new();
        write_text(&outcome, false, &mut out, &mut err).unwrap();

        assert_eq!(out, b"started\n");
        let err = String::from_utf8(err).unwrap();
        assert!(err.starts_with("warming up\n"));
        assert!(err.contains("Error: Command `sleep 30` timed out after 200ms"));
    }

    #[test]
    fn test_json_report() {
        let mut out = Vec::new();
        write_json(&failed(3), &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["status"], "failed");
        assert_eq!(value["exit_code"], 3);
        assert_eq!(value["command"][0], "docker");
        assert_eq!(value["stdout"], "partial\n");
        assert_eq!(value["stderr"], "Error response from daemon\n");
        assert!(value.get("duration_ms").is_none());
    }

    #[test]
    fn test_json_report_success() {
        let report = Report::from_outcome(&success());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["stdout"], "hello\n");
        assert_eq!(value["duration_ms"], 12);
        assert!(value.get("error").is_none());
    }
}
