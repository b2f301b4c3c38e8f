//! A spawned child process and its teardown.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdout};

use super::command::{CaptureMode, Command};
use super::error::{CleanupError, ProcessError};

/// A child process owned by exactly one invocation.
///
/// The child is spawned with `kill_on_drop`, so dropping a handle that was
/// never reaped kills the process instead of leaking it.
#[derive(Debug)]
pub struct RunningProcess {
    child: Child,
    pid: Option<u32>,
}

impl RunningProcess {
    /// Start `command`, piping its output when it is captured.
    pub fn spawn(command: &Command) -> Result<Self, ProcessError> {
        let mut cmd = Self::configure_command(command);

        let child = cmd.spawn().map_err(|e| {
            tracing::error!(
                "Failed to spawn '{}': {:?} (kind: {:?})",
                command.program(),
                e,
                e.kind()
            );
            if e.kind() == std::io::ErrorKind::NotFound {
                if let Some(dir) = command.working_dir() {
                    tracing::debug!("Working directory for failed spawn: {}", dir.display());
                }
            }
            ProcessError::Spawn {
                args: command.args().to_vec(),
                source: e,
            }
        })?;

        let pid = child.id();
        tracing::debug!("Spawned process {:?}: {}", pid, command.display());
        Ok(Self { child, pid })
    }

    fn configure_command(command: &Command) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(command.program());
        cmd.args(command.arguments());

        if let Some(env) = command.env() {
            cmd.envs(env);
        }

        if let Some(dir) = command.working_dir() {
            cmd.current_dir(dir);
        }

        match command.capture() {
            CaptureMode::Captured => {
                cmd.stdout(Stdio::piped());
                cmd.stderr(Stdio::piped());
            }
            CaptureMode::Discarded => {
                cmd.stdout(Stdio::inherit());
                cmd.stderr(Stdio::inherit());
            }
        }

        cmd.kill_on_drop(true);
        cmd
    }

    /// OS process id recorded at spawn time.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Take ownership of the output pipes. `None` when output is not
    /// captured or the pipes were already taken.
    pub fn take_streams(&mut self) -> Option<(ChildStdout, ChildStderr)> {
        match (self.child.stdout.take(), self.child.stderr.take()) {
            (Some(stdout), Some(stderr)) => Some((stdout, stderr)),
            _ => None,
        }
    }

    /// Wait for the child to exit and reap it.
    pub async fn wait(&mut self) -> std::io::Result<i32> {
        let status = self.child.wait().await?;
        Ok(exit_code(status))
    }

    /// Ask the child to exit (`SIGTERM` on Unix).
    #[cfg(unix)]
    pub fn terminate(&self) -> Result<(), CleanupError> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        // `id()` is `None` once the child has been reaped.
        let Some(pid) = self.child.id() else {
            return Ok(());
        };

        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(CleanupError::Signal {
                pid,
                source: errno.into(),
            }),
        }
    }

    #[cfg(not(unix))]
    pub fn terminate(&mut self) -> Result<(), CleanupError> {
        self.child.start_kill().map_err(CleanupError::Kill)
    }

    /// Kill the child and reap it.
    pub async fn kill(&mut self) -> Result<(), CleanupError> {
        self.child.kill().await.map_err(CleanupError::Kill)
    }

    /// Terminate, wait up to `grace`, then kill if the child is still alive.
    ///
    /// The child is reaped on every path that returns `Ok`.
    pub async fn shutdown(&mut self, grace: Duration) -> Result<(), CleanupError> {
        if let Err(e) = self.terminate() {
            tracing::warn!("{}; killing process {:?} instead", e, self.pid);
            return self.kill().await;
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(
                    "Process {:?} exited after termination request with code {}",
                    self.pid,
                    exit_code(status)
                );
                Ok(())
            }
            Ok(Err(e)) => Err(CleanupError::Reap(e)),
            Err(_) => {
                tracing::warn!(
                    "Process {:?} still running {:?} after termination request, killing it",
                    self.pid,
                    grace
                );
                self.kill().await
            }
        }
    }
}

/// What the runner needs from a spawned child once its pipes are taken.
#[async_trait]
pub trait ChildHandle: Send {
    fn pid(&self) -> Option<u32>;

    /// Wait for the child to exit and reap it.
    async fn wait(&mut self) -> std::io::Result<i32>;

    /// Tear the child down after an interruption.
    async fn shutdown(&mut self, grace: Duration) -> Result<(), CleanupError>;
}

#[async_trait]
impl ChildHandle for RunningProcess {
    fn pid(&self) -> Option<u32> {
        RunningProcess::pid(self)
    }

    async fn wait(&mut self) -> std::io::Result<i32> {
        RunningProcess::wait(self).await
    }

    async fn shutdown(&mut self, grace: Duration) -> Result<(), CleanupError> {
        RunningProcess::shutdown(self, grace).await
    }
}

/// Exit code of a finished child. A signal death maps to `-signal`.
pub fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    -1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::CommandBuilder;
    use std::time::Instant;
    use tokio::io::AsyncReadExt;

    fn sh(script: &str) -> Command {
        CommandBuilder::new("sh")
            .args(["-c", script])
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_spawn_and_wait() {
        let mut process = RunningProcess::spawn(&sh("exit 3")).unwrap();
        assert!(process.pid().is_some());
        assert_eq!(process.wait().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_spawn_missing_program() {
        let command = CommandBuilder::new("nonexistent_command_12345").build().unwrap();
        match RunningProcess::spawn(&command) {
            Err(ProcessError::Spawn { args, source }) => {
                assert_eq!(args, ["nonexistent_command_12345"]);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("Expected Spawn error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_spawn_invalid_working_dir() {
        let command = CommandBuilder::new("true")
            .current_dir(std::path::Path::new("/definitely/not/a/dir"))
            .build()
            .unwrap();
        assert!(matches!(
            RunningProcess::spawn(&command),
            Err(ProcessError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn test_streams_only_when_captured() {
        let mut captured = RunningProcess::spawn(&sh("echo out; echo err >&2")).unwrap();
        let (mut stdout, mut stderr) = captured.take_streams().unwrap();
        assert!(captured.take_streams().is_none());

        let mut out = String::new();
        let mut err = String::new();
        stdout.read_to_string(&mut out).await.unwrap();
        stderr.read_to_string(&mut err).await.unwrap();
        assert_eq!(out, "out\n");
        assert_eq!(err, "err\n");
        assert_eq!(captured.wait().await.unwrap(), 0);

        let command = sh("true").with_capture(CaptureMode::Discarded);
        let mut discarded = RunningProcess::spawn(&command).unwrap();
        assert!(discarded.take_streams().is_none());
        assert_eq!(discarded.wait().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_env_is_merged_over_inherited_environment() {
        let command = CommandBuilder::new("sh")
            .args(["-c", "printf '%s:%s' \"$PROCDRAIN_TEST_VAR\" \"${PATH:+has-path}\""])
            .env("PROCDRAIN_TEST_VAR", "set")
            .build()
            .unwrap();
        let mut process = RunningProcess::spawn(&command).unwrap();
        let (mut stdout, _stderr) = process.take_streams().unwrap();

        let mut out = String::new();
        stdout.read_to_string(&mut out).await.unwrap();
        process.wait().await.unwrap();
        assert_eq!(out, "set:has-path");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_death_maps_to_negative_code() {
        let mut process = RunningProcess::spawn(&sh("kill -9 $$")).unwrap();
        assert_eq!(process.wait().await.unwrap(), -9);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shutdown_terminates_cooperative_process() {
        let mut process = RunningProcess::spawn(&sh("exec sleep 30")).unwrap();

        let start = Instant::now();
        process.shutdown(Duration::from_secs(5)).await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shutdown_kills_process_ignoring_sigterm() {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let mut process = RunningProcess::spawn(&sh("trap '' TERM; sleep 5")).unwrap();
        let pid = process.pid().unwrap();
        // Let the shell install its trap before we signal it.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let grace = Duration::from_millis(300);
        let start = Instant::now();
        process.shutdown(grace).await.unwrap();
        let elapsed = start.elapsed();

        assert!(elapsed >= grace);
        assert!(elapsed < grace + Duration::from_secs(2));
        assert_eq!(kill(Pid::from_raw(pid as i32), None), Err(Errno::ESRCH));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_after_reap_is_noop() {
        let mut process = RunningProcess::spawn(&sh("true")).unwrap();
        process.wait().await.unwrap();
        assert!(process.terminate().is_ok());
        assert!(process.shutdown(Duration::from_millis(10)).await.is_ok());
    }
}
