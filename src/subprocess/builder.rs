use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use super::command::{CaptureMode, Command};
use super::error::ProcessError;

pub struct CommandBuilder {
    program: String,
    args: Vec<String>,
    env: Option<HashMap<String, String>>,
    working_dir: Option<std::path::PathBuf>,
    capture: CaptureMode,
    log_output_live: bool,
    timeout: Option<Duration>,
}

impl CommandBuilder {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            env: None,
            working_dir: None,
            capture: CaptureMode::default(),
            log_output_live: false,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let env = self.env.get_or_insert_with(HashMap::new);
        for (key, value) in vars {
            env.insert(key.as_ref().to_string(), value.as_ref().to_string());
        }
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.working_dir = Some(dir.to_path_buf());
        self
    }

    pub fn capture(mut self, capture: CaptureMode) -> Self {
        self.capture = capture;
        self
    }

    pub fn log_output_live(mut self, enabled: bool) -> Self {
        self.log_output_live = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Command, ProcessError> {
        if self.program.trim().is_empty() {
            return Err(ProcessError::InvalidCommand(
                "program name must not be empty".to_string(),
            ));
        }

        let mut command = Command::from_args(std::iter::once(self.program).chain(self.args))?
            .with_capture(self.capture)
            .with_log_output_live(self.log_output_live);
        if let Some(dir) = self.working_dir {
            command = command.with_working_dir(dir);
        }
        if let Some(env) = self.env {
            command = command.with_env(env);
        }
        if let Some(timeout) = self.timeout {
            command = command.with_timeout(timeout);
        }
        Ok(command)
    }
}
