// ABOUTME: Injection error types with SNAFU pattern.
// ABOUTME: Each variant names the step that failed; kind() gives a stable classification.

use crate::archive::ArchiveError;
use crate::runtime::{ContainerError, CopyError, RuntimeInfoError};
use crate::types::ContainerId;
use snafu::Snafu;
use std::path::PathBuf;

/// Terminal failure of a container operation. No step is retried.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InjectError {
    #[snafu(display("query runtime info: {source}"))]
    RuntimeInfo { source: RuntimeInfoError },

    #[snafu(display("create tar archive from '{}': {source}", path.display()))]
    Archive { path: PathBuf, source: ArchiveError },

    #[snafu(display("create tar archive from '{}': builder task failed: {source}", path.display()))]
    ArchiveTask {
        path: PathBuf,
        source: tokio::task::JoinError,
    },

    #[snafu(display("read archive stream: {source}"))]
    ArchiveStream { source: std::io::Error },

    #[snafu(display("inspect container {container}: {source}"))]
    Inspect {
        container: ContainerId,
        source: ContainerError,
    },

    #[snafu(display("no matching mount found for '{destination}'"))]
    NoMatchingMount { destination: String },

    #[snafu(display("creating prep container: {source}"))]
    HelperCreate { source: ContainerError },

    #[snafu(display("copy app to container: {source}"))]
    StageCopy { source: CopyError },

    #[snafu(display("copy into container {container}: {source}"))]
    DirectCopy {
        container: ContainerId,
        source: CopyError,
    },

    #[snafu(display("run prep container: {source}"))]
    HelperRun { source: ContainerError },

    #[snafu(display("prep container failed with status code: {code}"))]
    HelperExit { code: i64 },

    #[snafu(display("marshaling metadata: {source}"))]
    MetadataEncode { source: toml_edit::ser::Error },

    #[snafu(display("operation cancelled"))]
    Cancelled,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectErrorKind {
    /// The engine could not report its OS family.
    RuntimeInfoFailed,
    /// The source path does not exist or cannot be read.
    SourceUnreadable,
    /// Building or streaming the tar archive failed.
    ArchiveConstructionFailed,
    /// The target container could not be inspected.
    RuntimeInspectFailed,
    /// No mount covers the destination.
    NoMatchingMount,
    /// The helper container could not be created.
    HelperCreateFailed,
    /// Staging the archive into the helper failed.
    StageCopyFailed,
    /// The native copy into the target failed.
    DirectCopyFailed,
    /// The helper could not run, or its copy tool exited non-zero.
    HelperExecutionFailed,
    /// The metadata value could not be encoded.
    MetadataEncodeFailed,
    /// The caller cancelled the operation.
    Cancelled,
}

impl InjectError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> InjectErrorKind {
        match self {
            InjectError::RuntimeInfo { .. } => InjectErrorKind::RuntimeInfoFailed,
            InjectError::Archive {
                source: ArchiveError::SourceUnreadable { .. },
                ..
            } => InjectErrorKind::SourceUnreadable,
            InjectError::Archive { .. }
            | InjectError::ArchiveTask { .. }
            | InjectError::ArchiveStream { .. } => InjectErrorKind::ArchiveConstructionFailed,
            InjectError::Inspect { .. } => InjectErrorKind::RuntimeInspectFailed,
            InjectError::NoMatchingMount { .. } => InjectErrorKind::NoMatchingMount,
            InjectError::HelperCreate { .. } => InjectErrorKind::HelperCreateFailed,
            InjectError::StageCopy { .. } => InjectErrorKind::StageCopyFailed,
            InjectError::DirectCopy { .. } => InjectErrorKind::DirectCopyFailed,
            InjectError::HelperRun { .. } | InjectError::HelperExit { .. } => {
                InjectErrorKind::HelperExecutionFailed
            }
            InjectError::MetadataEncode { .. } => InjectErrorKind::MetadataEncodeFailed,
            InjectError::Cancelled => InjectErrorKind::Cancelled,
        }
    }

    /// Exit code of the helper's copy tool, when that is what failed.
    pub fn exit_code(&self) -> Option<i64> {
        match self {
            InjectError::HelperExit { code } => Some(*code),
            _ => None,
        }
    }
}
