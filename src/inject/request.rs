// ABOUTME: InjectionRequest and the CopyDir operation built from it.
// ABOUTME: Archives a local directory or zip and delivers it with the engine's strategy.

use super::error::{ArchiveSnafu, ArchiveTaskSnafu, InjectError};
use super::{ContainerOperation, InjectOptions, Strategy, cancellable};
use crate::archive::{FileFilter, Owner, TarArchive, archive_source};
use crate::runtime::{FullRuntime, OsFamily, OutputSink};
use crate::types::ContainerId;
use async_trait::async_trait;
use snafu::ResultExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What to inject and where.
#[derive(Clone)]
pub struct InjectionRequest {
    /// Local directory or zip file.
    pub source: PathBuf,
    /// Runtime-native destination path inside the container.
    pub destination: String,
    /// Ownership for every entry; `None` keeps what is on disk.
    pub owner: Option<Owner>,
    /// Entries for which this returns false are left out.
    pub filter: Option<FileFilter>,
}

impl InjectionRequest {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            owner: None,
            filter: None,
        }
    }

    pub fn with_owner(mut self, uid: u64, gid: u64) -> Self {
        self.owner = Some(Owner::new(uid, gid));
        self
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Build the archive for `strategy` off the async runtime.
    async fn archive(&self, strategy: Strategy) -> Result<TarArchive, InjectError> {
        let source = self.source.clone();
        let root = strategy.archive_root(&self.destination);
        let owner = self.owner;
        let filter = self.filter.clone();

        let built = tokio::task::spawn_blocking(move || {
            archive_source(&source, &root, owner, filter.as_ref(), OsFamily::host())
        })
        .await
        .context(ArchiveTaskSnafu {
            path: self.source.clone(),
        })?;

        built.context(ArchiveSnafu {
            path: self.source.clone(),
        })
    }
}

impl std::fmt::Debug for InjectionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectionRequest")
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("owner", &self.owner)
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Copies a directory or zip file into a container.
#[derive(Debug, Clone)]
pub struct CopyDir {
    request: InjectionRequest,
    options: InjectOptions,
}

/// Operation that injects `request` with default options.
pub fn copy_dir(request: InjectionRequest) -> CopyDir {
    CopyDir {
        request,
        options: InjectOptions::default(),
    }
}

impl CopyDir {
    pub fn with_options(mut self, options: InjectOptions) -> Self {
        self.options = options;
        self
    }

    pub fn request(&self) -> &InjectionRequest {
        &self.request
    }
}

#[async_trait]
impl ContainerOperation for CopyDir {
    fn name(&self) -> &'static str {
        "copy-dir"
    }

    #[tracing::instrument(skip_all, fields(op = self.name(), container = %container.short(), destination = %self.request.destination))]
    async fn run(
        &self,
        runtime: Arc<dyn FullRuntime>,
        cancel: CancellationToken,
        container: &ContainerId,
        _stdout: &mut OutputSink,
        stderr: &mut OutputSink,
    ) -> Result<(), InjectError> {
        let strategy = Strategy::detect(runtime.as_ref(), &cancel).await?;
        let archive = cancellable(&cancel, self.request.archive(strategy)).await??;
        tracing::debug!(entries = archive.entry_count(), bytes = archive.len(), "archive built");

        strategy
            .deliver(
                &runtime,
                &cancel,
                container,
                archive,
                &self.request.destination,
                stderr,
                &self.options,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::InjectErrorKind;
    use crate::runtime::fake::{FakeRuntime, Step, mount};
    use std::fs;
    use tempfile::TempDir;

    fn source_tree() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}\n").unwrap();
        fs::write(dir.path().join("README.md"), "# app\n").unwrap();
        fs::write(dir.path().join(".env"), "SECRET=1\n").unwrap();
        dir
    }

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        tar::Archive::new(bytes)
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect()
    }

    async fn run(fake: &Arc<FakeRuntime>, op: &CopyDir) -> Result<(), InjectError> {
        let runtime: Arc<dyn FullRuntime> = fake.clone();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        op.run(
            runtime,
            CancellationToken::new(),
            &ContainerId::new("builder"),
            &mut stdout,
            &mut stderr,
        )
        .await
    }

    #[tokio::test]
    async fn linux_engine_copies_into_root() {
        let tree = source_tree();
        let fake = Arc::new(FakeRuntime::linux());
        let op = copy_dir(InjectionRequest::new(tree.path(), "/workspace").with_owner(1000, 1000));

        run(&fake, &op).await.unwrap();

        assert_eq!(fake.calls(), vec![Step::Info, Step::Copy]);
        let copies = fake.copies();
        assert_eq!(copies[0].path, "/");

        let mut archive = tar::Archive::new(copies[0].bytes.as_slice());
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            assert!(entry.path().unwrap().starts_with("workspace"));
            assert_eq!(entry.header().uid().unwrap(), 1000);
            assert_eq!(entry.header().gid().unwrap(), 1000);
        }
    }

    #[tokio::test]
    async fn filter_drops_rejected_entries() {
        let tree = source_tree();
        let fake = Arc::new(FakeRuntime::linux());
        let op = copy_dir(
            InjectionRequest::new(tree.path(), "/workspace")
                .with_filter(|path| path.file_name().is_none_or(|name| name != ".env")),
        );

        run(&fake, &op).await.unwrap();

        let names = entry_names(&fake.copies()[0].bytes);
        assert_eq!(
            names,
            vec![
                "workspace",
                "workspace/README.md",
                "workspace/src",
                "workspace/src/main.rs"
            ]
        );
    }

    #[tokio::test]
    async fn windows_engine_stages_through_helper() {
        let tree = source_tree();
        let fake = Arc::new(FakeRuntime::windows(vec![mount("app", r"c:\workspace")]));
        let op = copy_dir(InjectionRequest::new(tree.path(), r"c:\workspace"));

        run(&fake, &op).await.unwrap();

        assert_eq!(
            fake.calls(),
            vec![
                Step::Info,
                Step::Inspect,
                Step::Create,
                Step::Copy,
                Step::Run,
                Step::Remove
            ]
        );
        let copies = fake.copies();
        assert_eq!(copies[0].path, "/windows");
        assert!(
            entry_names(&copies[0].bytes)
                .iter()
                .all(|name| name.starts_with("workspace"))
        );
    }

    #[tokio::test]
    async fn missing_source_is_unreadable() {
        let fake = Arc::new(FakeRuntime::linux());
        let op = copy_dir(InjectionRequest::new("/definitely/not/here", "/workspace"));

        let err = run(&fake, &op).await.unwrap_err();

        assert_eq!(err.kind(), InjectErrorKind::SourceUnreadable);
        assert!(fake.copies().is_empty());
    }

    #[tokio::test]
    async fn info_failure_stops_before_archiving() {
        let tree = source_tree();
        let fake = Arc::new(FakeRuntime::linux().failing_at(Step::Info));
        let op = copy_dir(InjectionRequest::new(tree.path(), "/workspace"));

        let err = run(&fake, &op).await.unwrap_err();

        assert_eq!(err.kind(), InjectErrorKind::RuntimeInfoFailed);
        assert_eq!(fake.calls(), vec![Step::Info]);
    }

    #[test]
    fn debug_hides_filter() {
        let request = InjectionRequest::new("/app", "/workspace").with_filter(|_| true);
        let rendered = format!("{request:?}");
        assert!(rendered.contains("<fn>"));
        assert!(rendered.contains("/workspace"));
    }
}
