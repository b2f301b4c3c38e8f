use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::ProcessError;

/// Whether the child's stdout and stderr are piped back to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Pipe both streams, capture them, and optionally log them live.
    #[default]
    Captured,
    /// Leave both streams inherited from this process.
    Discarded,
}

/// An external program invocation. Build one with
/// [`CommandBuilder`](super::CommandBuilder) or [`Command::from_args`].
///
/// The argument vector always starts with a non-empty program name. The
/// fields are private so that nothing can empty it after construction;
/// options are changed through the consuming `with_*` methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    /// Merged over the inherited environment when set.
    env: Option<HashMap<String, String>>,
    capture: CaptureMode,
    /// Forward each completed output line to the line sink.
    log_output_live: bool,
    timeout: Option<Duration>,
}

impl Command {
    /// Build a command directly from an argument vector.
    pub fn from_args<I, S>(args: I) -> Result<Self, ProcessError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        match args.first() {
            Some(program) if !program.trim().is_empty() => Ok(Self {
                args,
                working_dir: None,
                env: None,
                capture: CaptureMode::default(),
                log_output_live: false,
                timeout: None,
            }),
            _ => Err(ProcessError::InvalidCommand(
                "argument vector must start with a program name".to_string(),
            )),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Replace the environment overlay.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn with_capture(mut self, capture: CaptureMode) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_log_output_live(mut self, enabled: bool) -> Self {
        self.log_output_live = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Program followed by its arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn into_args(self) -> Vec<String> {
        self.args
    }

    pub fn program(&self) -> &str {
        self.args.first().map_or("", String::as_str)
    }

    /// Arguments after the program name.
    pub fn arguments(&self) -> &[String] {
        self.args.get(1..).unwrap_or_default()
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn env(&self) -> Option<&HashMap<String, String>> {
        self.env.as_ref()
    }

    pub fn capture(&self) -> CaptureMode {
        self.capture
    }

    pub fn log_output_live(&self) -> bool {
        self.log_output_live
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Shell-quoted rendering for logs and error messages.
    pub fn display(&self) -> String {
        shell_words::join(&self.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_args() {
        let command = Command::from_args(["sh", "-c", "echo hi"]).unwrap();
        assert_eq!(command.program(), "sh");
        assert_eq!(command.arguments(), ["-c", "echo hi"]);
        assert_eq!(command.display(), "sh -c 'echo hi'");
        assert_eq!(command.capture(), CaptureMode::Captured);
    }

    #[test]
    fn test_options_keep_the_program() {
        let command = Command::from_args(["true"])
            .unwrap()
            .with_working_dir("/tmp")
            .with_env(HashMap::from([("K".to_string(), "V".to_string())]))
            .with_capture(CaptureMode::Discarded)
            .with_log_output_live(true)
            .with_timeout(Duration::from_secs(2));

        assert_eq!(command.args(), ["true"]);
        assert_eq!(command.program(), "true");
        assert!(command.arguments().is_empty());
        assert_eq!(command.working_dir(), Some(Path::new("/tmp")));
        assert_eq!(command.env().unwrap()["K"], "V");
        assert_eq!(command.capture(), CaptureMode::Discarded);
        assert!(command.log_output_live());
        assert_eq!(command.timeout(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_from_args_rejects_empty_vector() {
        let result = Command::from_args(Vec::<String>::new());
        assert!(matches!(result, Err(ProcessError::InvalidCommand(_))));

        let result = Command::from_args([""]);
        assert!(matches!(result, Err(ProcessError::InvalidCommand(_))));
    }
}
