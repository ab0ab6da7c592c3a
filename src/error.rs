// ABOUTME: Application-wide error types for ferry.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::config::SOCKET_ENV;
use crate::inject::InjectError;
use crate::runtime::{RuntimeError, RuntimeErrorKind};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Inject(#[from] InjectError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Next step for the user when the engine could not be reached.
    pub fn hint(&self) -> Option<String> {
        let Error::Runtime(e) = self else {
            return None;
        };
        match e.kind() {
            RuntimeErrorKind::NoRuntimeFound => Some(format!(
                "start Docker or Podman, or set {SOCKET_ENV} to the engine socket"
            )),
            RuntimeErrorKind::UnsupportedHost => Some(format!(
                "DOCKER_HOST must be a unix:// or npipe:// address; unset it or set {SOCKET_ENV}"
            )),
            RuntimeErrorKind::ConnectionFailed => {
                Some("check that the engine is running and its socket is readable".to_string())
            }
            RuntimeErrorKind::RuntimeOperation => None,
        }
    }
}
