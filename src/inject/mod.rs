// ABOUTME: Container content injection: archive a source and deliver it into a running container.
// ABOUTME: Chooses the direct or compensated strategy from the engine's OS family.

mod compensated;
mod direct;
mod error;
mod metadata;
mod mount;
mod request;

pub use compensated::{
    DEFAULT_STAGING_DIR, HelperConfig, WINDOWS_CONTAINER_ADMIN, copy_compensated,
};
pub use direct::{DEFAULT_PIPE_CAPACITY, copy_direct};
pub use error::{InjectError, InjectErrorKind};
pub use metadata::{RunImageMetadata, StackMetadata, WriteToml, write_stack_toml};
pub use mount::{Destination, NodeKind, classify_destination, find_mount};
pub use request::{CopyDir, InjectionRequest, copy_dir};

use crate::archive::{TarArchive, tar_path, win_path_to_tar_path};
use crate::runtime::{FullRuntime, OsFamily, OutputSink};
use crate::types::ContainerId;
use async_trait::async_trait;
use error::{CancelledSnafu, RuntimeInfoSnafu};
use snafu::ResultExt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A unit of work against a running container.
///
/// Operations are built once and run against a runtime handle. They either
/// succeed or return a single terminal error; nothing is retried.
#[async_trait]
pub trait ContainerOperation: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn run(
        &self,
        runtime: Arc<dyn FullRuntime>,
        cancel: CancellationToken,
        container: &ContainerId,
        stdout: &mut OutputSink,
        stderr: &mut OutputSink,
    ) -> Result<(), InjectError>;
}

/// Tuning shared by every injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectOptions {
    pub helper: HelperConfig,
    pub pipe_capacity: usize,
}

impl Default for InjectOptions {
    fn default() -> Self {
        Self {
            helper: HelperConfig::default(),
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }
}

/// How an archive reaches its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Native copy into the container root.
    Direct,
    /// Staged through a helper container bound to the destination's mount.
    Compensated,
}

impl Strategy {
    pub fn for_os(os: OsFamily) -> Self {
        match os {
            OsFamily::Linux => Strategy::Direct,
            OsFamily::Windows => Strategy::Compensated,
        }
    }

    /// Ask the engine which strategy applies to it.
    pub(crate) async fn detect(
        runtime: &dyn FullRuntime,
        cancel: &CancellationToken,
    ) -> Result<Self, InjectError> {
        let info = cancellable(cancel, runtime.info())
            .await?
            .context(RuntimeInfoSnafu)?;
        let strategy = Self::for_os(info.os_family());
        tracing::debug!(os_type = %info.os_type, ?strategy, "selected injection strategy");
        Ok(strategy)
    }

    /// Tar entry prefix under which the archive must place `destination`.
    ///
    /// Direct copies extract at `/`, so the destination is the prefix. The
    /// helper extracts at its staging directory, where the copy tool expects
    /// the drive-less form.
    pub fn archive_root(self, destination: &str) -> String {
        match self {
            Strategy::Direct => tar_path(destination),
            Strategy::Compensated => win_path_to_tar_path(destination),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn deliver(
        self,
        runtime: &Arc<dyn FullRuntime>,
        cancel: &CancellationToken,
        container: &ContainerId,
        archive: TarArchive,
        destination: &str,
        stderr: &mut OutputSink,
        options: &InjectOptions,
    ) -> Result<(), InjectError> {
        match self {
            Strategy::Direct => {
                copy_direct(
                    runtime.as_ref(),
                    cancel,
                    container,
                    archive.into_reader(),
                    options.pipe_capacity,
                )
                .await
            }
            Strategy::Compensated => {
                copy_compensated(
                    runtime,
                    cancel,
                    container,
                    archive,
                    destination,
                    stderr,
                    &options.helper,
                )
                .await
            }
        }
    }
}

/// Race `fut` against the cancellation token.
///
/// Cancellation wins ties, so an already-cancelled token never starts work.
pub(crate) async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, InjectError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => CancelledSnafu.fail(),
        output = fut => Ok(output),
    }
}
