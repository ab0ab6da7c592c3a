// ABOUTME: Configuration types and parsing for ferry.yml.
// ABOUTME: Handles YAML parsing, discovery, defaults, and environment overrides.

use crate::error::{Error, Result};
use crate::inject::{DEFAULT_PIPE_CAPACITY, HelperConfig, InjectOptions};
use crate::runtime::RuntimeConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "ferry.yml";
pub const CONFIG_FILENAME_ALT: &str = "ferry.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".ferry/config.yml";

/// Environment variable that replaces `runtime.socket`.
pub const SOCKET_ENV: &str = "FERRY_SOCKET";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Timeout for runtime API calls.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default)]
    pub helper: HelperConfig,

    #[serde(
        default = "default_pipe_capacity",
        deserialize_with = "deserialize_pipe_capacity"
    )]
    pub pipe_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            timeout: default_timeout(),
            helper: HelperConfig::default(),
            pipe_capacity: default_pipe_capacity(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_pipe_capacity() -> usize {
    DEFAULT_PIPE_CAPACITY
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?.with_env_overrides())
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading configuration");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Like [`Config::discover`], but a missing file yields the defaults.
    pub fn discover_or_default(dir: &Path) -> Result<Self> {
        match Self::discover(dir) {
            Err(Error::ConfigNotFound(_)) => Ok(Self::default().with_env_overrides()),
            other => other,
        }
    }

    /// Options handed to injection operations.
    pub fn inject_options(&self) -> InjectOptions {
        InjectOptions {
            helper: self.helper.clone(),
            pipe_capacity: self.pipe_capacity,
        }
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(socket) = std::env::var(SOCKET_ENV)
            && !socket.is_empty()
        {
            self.runtime.socket = Some(socket);
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.helper.user.is_empty() {
            return Err(Error::InvalidConfig("helper.user cannot be empty".into()));
        }
        if !self.helper.staging_dir.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "helper.staging_dir must be absolute, got '{}'",
                self.helper.staging_dir
            )));
        }
        Ok(())
    }
}

// Custom deserializers

fn deserialize_pipe_capacity<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let capacity = usize::deserialize(deserializer)?;
    if capacity == 0 {
        return Err(serde::de::Error::custom("pipe_capacity must be greater than zero"));
    }
    Ok(capacity)
}
