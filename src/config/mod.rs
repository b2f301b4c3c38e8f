//! Runner configuration.
//!
//! Values come from defaults, then an optional TOML file, then
//! `PROCDRAIN_*` environment variables:
//!
//! ```toml
//! chunk_size = 8192
//! grace_period = "1s"
//!
//! [capture_limit]
//! max_bytes = 10485760
//! strategy = "drop_oldest"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CHUNK_SIZE: &str = "PROCDRAIN_CHUNK_SIZE";
pub const ENV_GRACE_PERIOD: &str = "PROCDRAIN_GRACE_PERIOD";

pub const DEFAULT_CHUNK_SIZE: usize = 8192;
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for {var}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// What to do once a stream's capture buffer reaches its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowStrategy {
    /// Keep the most recent `max_bytes`, discarding the oldest output.
    #[default]
    DropOldest,
    /// Abort the command with `ProcessError::CaptureLimitExceeded`.
    Fail,
}

/// Upper bound on the bytes captured per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureLimit {
    pub max_bytes: usize,
    #[serde(default)]
    pub strategy: OverflowStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Maximum bytes read from a ready stream in one go.
    pub chunk_size: usize,
    /// How long a terminated child gets to exit before it is killed.
    #[serde(with = "humantime_serde")]
    pub grace_period: Duration,
    /// Capture is unbounded when unset.
    pub capture_limit: Option<CaptureLimit>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            grace_period: DEFAULT_GRACE_PERIOD,
            capture_limit: None,
        }
    }
}

impl RunnerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RunnerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file and apply environment overrides on top of it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.merge_env_vars()?;
        tracing::debug!("Loaded runner config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.merge_env_vars()?;
        Ok(config)
    }

    pub fn merge_env_vars(&mut self) -> Result<(), ConfigError> {
        self.merge_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn merge_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CHUNK_SIZE) {
            self.chunk_size = value.trim().parse().map_err(|e| ConfigError::Env {
                var: ENV_CHUNK_SIZE,
                value: value.clone(),
                reason: format!("{}", e),
            })?;
        }

        if let Some(value) = lookup(ENV_GRACE_PERIOD) {
            self.grace_period =
                humantime::parse_duration(value.trim()).map_err(|e| ConfigError::Env {
                    var: ENV_GRACE_PERIOD,
                    value: value.clone(),
                    reason: e.to_string(),
                })?;
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be greater than 0".into()));
        }
        if let Some(limit) = &self.capture_limit {
            if limit.max_bytes == 0 {
                return Err(ConfigError::Invalid(
                    "capture_limit.max_bytes must be greater than 0".into(),
                ));
            }
        }
        Ok(())
    }
}
