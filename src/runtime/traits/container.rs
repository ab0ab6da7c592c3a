// ABOUTME: Container operations trait for container runtimes.
// ABOUTME: Create, inspect, run to completion, and remove containers.

use super::sealed::Sealed;
use super::shared_types::{ContainerConfig, ContainerInfo, OutputSink};
use crate::types::ContainerId;
use async_trait::async_trait;

/// Container lifecycle operations used by injections.
#[async_trait]
pub trait ContainerOps: Sealed + Send + Sync {
    /// Create (but do not start) a container from the given configuration.
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError>;

    /// Remove a container.
    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError>;

    /// Get image and mount information about a container.
    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError>;

    /// Start a created container and wait for it to exit.
    ///
    /// Output is streamed into the sinks while the container runs. Returns
    /// the exit code; a non-zero code is not an error at this layer.
    async fn run_container(
        &self,
        id: &ContainerId,
        stdout: &mut OutputSink,
        stderr: &mut OutputSink,
    ) -> Result<i64, ContainerError>;
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container already exists: {0}")]
    AlreadyExists(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("output stream failed: {0}")]
    Output(#[from] std::io::Error),

    #[error("runtime error: {0}")]
    Runtime(String),
}
