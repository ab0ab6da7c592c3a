// ABOUTME: Metadata injection: encode a value as TOML and deliver it as a single file.
// ABOUTME: Includes the stack.toml payload written for the build lifecycle.

use super::error::{ArchiveSnafu, InjectError, MetadataEncodeSnafu};
use super::{ContainerOperation, InjectOptions, Strategy};
use crate::archive::{NORMALIZED_DATE_TIME, TarBuilder};
use crate::runtime::{FullRuntime, OutputSink};
use crate::types::ContainerId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Mode of written metadata files.
const METADATA_MODE: u32 = 0o755;

/// Run image the lifecycle exports onto, with optional registry mirrors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunImageMetadata {
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mirrors: Vec<String>,
}

/// Contents of `stack.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackMetadata {
    #[serde(rename = "run-image")]
    pub run_image: RunImageMetadata,
}

/// Writes `value`, encoded as TOML, to a file in the container.
#[derive(Debug, Clone)]
pub struct WriteToml<T> {
    name: &'static str,
    destination: String,
    value: T,
    options: InjectOptions,
}

impl<T> WriteToml<T>
where
    T: Serialize + Send + Sync,
{
    pub fn new(destination: impl Into<String>, value: T) -> Self {
        Self {
            name: "write-toml",
            destination: destination.into(),
            value,
            options: InjectOptions::default(),
        }
    }

    pub fn with_options(mut self, options: InjectOptions) -> Self {
        self.options = options;
        self
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    fn encode(&self) -> Result<String, InjectError> {
        toml_edit::ser::to_string_pretty(&self.value).context(MetadataEncodeSnafu)
    }
}

/// Operation writing `stack.toml` to `destination`.
pub fn write_stack_toml(destination: impl Into<String>, stack: StackMetadata) -> WriteToml<StackMetadata> {
    WriteToml {
        name: "write-stack-toml",
        ..WriteToml::new(destination, stack)
    }
}

#[async_trait]
impl<T> ContainerOperation for WriteToml<T>
where
    T: Serialize + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    #[tracing::instrument(skip_all, fields(op = self.name, container = %container.short(), destination = %self.destination))]
    async fn run(
        &self,
        runtime: Arc<dyn FullRuntime>,
        cancel: CancellationToken,
        container: &ContainerId,
        _stdout: &mut OutputSink,
        stderr: &mut OutputSink,
    ) -> Result<(), InjectError> {
        // Encoding problems are reported before the engine is contacted.
        let content = self.encode()?;

        let strategy = Strategy::detect(runtime.as_ref(), &cancel).await?;
        let mut builder = TarBuilder::new();
        builder.add_file(
            strategy.archive_root(&self.destination),
            METADATA_MODE,
            NORMALIZED_DATE_TIME,
            content,
        );
        let archive = builder.build().context(ArchiveSnafu {
            path: PathBuf::from(&self.destination),
        })?;

        strategy
            .deliver(
                &runtime,
                &cancel,
                container,
                archive,
                &self.destination,
                stderr,
                &self.options,
            )
            .await
    }
}
