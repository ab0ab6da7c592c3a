// ABOUTME: Compensated injection for Windows engines, where copying onto a mounted volume is unreliable.
// ABOUTME: Stages the archive in a throwaway helper bound to the same mount and moves it with xcopy.

use super::cancellable;
use super::error::{
    HelperCreateSnafu, HelperExitSnafu, HelperRunSnafu, InjectError, InspectSnafu,
    StageCopySnafu,
};
use super::mount::{NodeKind, classify_destination, find_mount};
use crate::archive::{TarArchive, win_path_to_tar_path};
use crate::runtime::{
    ContainerConfig, ContainerError, ContainerOps, CopyOps, Isolation, MountPoint, OutputSink,
};
use crate::types::{ContainerId, ImageId};
use serde::Deserialize;
use snafu::ResultExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Administrative identity inside Windows containers.
pub const WINDOWS_CONTAINER_ADMIN: &str = "ContainerAdministrator";

/// Where the archive is extracted inside the helper before the move.
pub const DEFAULT_STAGING_DIR: &str = "/windows";

/// Settings for the helper container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    /// User the helper runs as; must be able to write to the mount.
    pub user: String,
    /// Staging directory inside the helper, in the engine's copy-path form.
    pub staging_dir: String,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            user: WINDOWS_CONTAINER_ADMIN.to_string(),
            staging_dir: DEFAULT_STAGING_DIR.to_string(),
        }
    }
}

impl HelperConfig {
    /// The staging directory as a Windows path on the system drive.
    fn staging_source(&self) -> String {
        format!("c:{}", self.staging_dir.replace('/', "\\"))
    }

    /// Command that moves the staged copy of `destination` into place.
    ///
    /// `xcopy` asks whether the target is a file or a directory; the answer
    /// is piped in.
    pub fn copy_command(&self, destination: &str, kind: NodeKind) -> Vec<String> {
        let relative = win_path_to_tar_path(destination).replace('/', "\\");
        vec![
            "cmd".to_string(),
            "/c".to_string(),
            format!(
                r"echo {}|xcopy /e /h /y /c /b {}\{} {}",
                kind.flag(),
                self.staging_source(),
                relative,
                destination
            ),
        ]
    }

    /// Container configuration for a helper that shares `mount` with the target.
    pub fn container_config(
        &self,
        image: ImageId,
        destination: &str,
        kind: NodeKind,
        mount: &MountPoint,
    ) -> ContainerConfig {
        ContainerConfig {
            command: Some(self.copy_command(destination, kind)),
            working_dir: Some("/".to_string()),
            user: Some(self.user.clone()),
            binds: vec![mount.bind_spec()],
            isolation: Some(Isolation::Process),
            ..ContainerConfig::new(image)
        }
    }
}

/// A created helper container that is force-removed exactly once.
///
/// `release` removes it on normal exit paths. If the guard is dropped
/// without being released (panic, or the operation future being dropped),
/// the removal is spawned onto the runtime instead. Either way the removal
/// runs on its own task, so cancelling the operation cannot interrupt it.
struct HelperContainer<R: ContainerOps + ?Sized + 'static> {
    runtime: Arc<R>,
    id: ContainerId,
    released: bool,
}

impl<R: ContainerOps + ?Sized + 'static> HelperContainer<R> {
    fn new(runtime: Arc<R>, id: ContainerId) -> Self {
        Self {
            runtime,
            id,
            released: false,
        }
    }

    async fn release(mut self) {
        self.released = true;
        let task = tokio::spawn(remove_helper(self.runtime.clone(), self.id.clone()));
        if let Err(e) = task.await {
            tracing::warn!(helper = %self.id.short(), "helper removal task failed: {}", e);
        }
    }
}

impl<R: ContainerOps + ?Sized + 'static> Drop for HelperContainer<R> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(remove_helper(self.runtime.clone(), self.id.clone()));
            }
            Err(_) => {
                tracing::warn!(helper = %self.id, "no async runtime to remove helper container");
            }
        }
    }
}

/// Force-remove a helper. Failures are logged and swallowed: the outcome of
/// the injection is already decided.
async fn remove_helper<R: ContainerOps + ?Sized>(runtime: Arc<R>, id: ContainerId) {
    match runtime.remove_container(&id, true).await {
        Ok(()) => tracing::debug!(helper = %id.short(), "helper removed"),
        Err(e) => tracing::warn!(helper = %id.short(), "failed to remove helper container: {}", e),
    }
}

/// Inject `archive` into `destination` of a Windows `container` by way of a
/// helper container.
///
/// The archive must have been built with entry names from
/// [`win_path_to_tar_path`], so that it lands under the staging directory
/// exactly where the helper's copy command looks for it.
#[tracing::instrument(skip_all, fields(container = %container.short(), destination = %destination))]
pub async fn copy_compensated<R>(
    runtime: &Arc<R>,
    cancel: &CancellationToken,
    container: &ContainerId,
    archive: TarArchive,
    destination: &str,
    stderr: &mut OutputSink,
    helper: &HelperConfig,
) -> Result<(), InjectError>
where
    R: ContainerOps + CopyOps + ?Sized + 'static,
{
    let info = cancellable(cancel, runtime.inspect_container(container))
        .await?
        .context(InspectSnafu {
            container: container.clone(),
        })?;

    let target = classify_destination(destination);
    let mount = find_mount(&info, &target.probe)?;
    tracing::debug!(mount = %mount.bind_spec(), kind = target.kind.flag(), "resolved mount");

    let config = helper.container_config(info.image.clone(), destination, target.kind, mount);
    let guard = create_helper(runtime, config).await?;
    tracing::debug!(helper = %guard.id.short(), "created prep container");

    // A cancel that arrived during creation is seen by the first staging step.
    let outcome = stage_and_run(runtime.as_ref(), cancel, &guard.id, archive, stderr, helper).await;
    guard.release().await;
    outcome
}

/// Create the helper on its own task, which wraps the new id in a guard.
///
/// Creation is never raced against the cancel token. If the operation is
/// dropped while the engine is still creating the helper, the task's output
/// is dropped once it completes and the guard removes the container.
async fn create_helper<R>(
    runtime: &Arc<R>,
    config: ContainerConfig,
) -> Result<HelperContainer<R>, InjectError>
where
    R: ContainerOps + ?Sized + 'static,
{
    let runtime = Arc::clone(runtime);
    let task = tokio::spawn(async move {
        let id = runtime.create_container(&config).await?;
        Ok::<_, ContainerError>(HelperContainer::new(runtime, id))
    });
    match task.await {
        Ok(created) => created.context(HelperCreateSnafu),
        Err(e) => Err(ContainerError::Runtime(e.to_string())).context(HelperCreateSnafu),
    }
}

async fn stage_and_run<R>(
    runtime: &R,
    cancel: &CancellationToken,
    helper_id: &ContainerId,
    archive: TarArchive,
    stderr: &mut OutputSink,
    helper: &HelperConfig,
) -> Result<(), InjectError>
where
    R: ContainerOps + CopyOps + ?Sized,
{
    cancellable(
        cancel,
        runtime.copy_to_container(helper_id, &helper.staging_dir, archive.into_reader()),
    )
    .await?
    .context(StageCopySnafu)?;
    tracing::debug!(helper = %helper_id.short(), "staged archive");

    // The copy tool's stdout is noise; only stderr is forwarded.
    let mut discard = tokio::io::sink();
    let code = cancellable(cancel, runtime.run_container(helper_id, &mut discard, stderr))
        .await?
        .context(HelperRunSnafu)?;

    if code != 0 {
        return HelperExitSnafu { code }.fail();
    }
    Ok(())
}
