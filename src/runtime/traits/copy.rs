// ABOUTME: Copy-into-container trait for container runtimes.
// ABOUTME: Extracts a tar stream at a path inside a container's filesystem.

use super::sealed::Sealed;
use super::shared_types::ArchiveReader;
use crate::types::ContainerId;
use async_trait::async_trait;

/// The runtime's native "copy into container" primitive.
#[async_trait]
pub trait CopyOps: Sealed + Send + Sync {
    /// Extract the tar stream produced by `archive` at `path` inside the
    /// container. Entry paths in the archive are relative to `path`.
    async fn copy_to_container(
        &self,
        id: &ContainerId,
        path: &str,
        archive: ArchiveReader,
    ) -> Result<(), CopyError>;
}

/// Errors from copy operations.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("container or destination path not found: {0}")]
    NotFound(String),

    #[error("destination is read-only: {0}")]
    ReadOnly(String),

    #[error("reading archive stream: {0}")]
    Stream(#[from] std::io::Error),

    #[error("runtime error: {0}")]
    Runtime(String),
}
