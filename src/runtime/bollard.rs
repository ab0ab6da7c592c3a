// ABOUTME: Bollard-based container runtime implementation.
// ABOUTME: Supports Docker (Linux and Windows engines) and Podman via the Docker-compatible API.

use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    ArchiveReader, ContainerConfig, ContainerError, ContainerInfo, ContainerOps, CopyError,
    CopyOps, Isolation, MountPoint, OutputSink, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::runtime::types::{RuntimeEndpoint, RuntimeType};
use crate::types::{ContainerId, ImageId};
use async_trait::async_trait;
use bollard::{Docker, body_try_stream};
use bollard::models::{ContainerCreateBody, HostConfig, HostConfigIsolationEnum};
use bollard::query_parameters::{
    AttachContainerOptions, CreateContainerOptions, InspectContainerOptions,
    RemoveContainerOptions, StartContainerOptions, UploadToContainerOptions,
    WaitContainerOptions,
};
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_container_create_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::ImageNotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ContainerError::AlreadyExists(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_upload_error(e: bollard::errors::Error) -> CopyError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => CopyError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 403 => CopyError::ReadOnly(message.clone()),
        _ => CopyError::Runtime(e.to_string()),
    }
}

/// First read error seen while streaming an archive.
type ReadErrorSlot = Arc<Mutex<Option<io::Error>>>;

/// Stream `archive` chunk by chunk for an upload body.
///
/// A failed read surfaces to the engine only as a truncated body, so the
/// first one is also kept in the returned slot.
fn archive_stream(
    archive: ArchiveReader,
) -> (
    impl Stream<Item = io::Result<Bytes>> + Send + 'static,
    ReadErrorSlot,
) {
    let read_error = ReadErrorSlot::default();
    let slot = Arc::clone(&read_error);
    let stream = ReaderStream::new(archive).inspect_err(move |e| {
        if let Ok(mut slot) = slot.lock() {
            slot.get_or_insert_with(|| io::Error::new(e.kind(), e.to_string()));
        }
    });
    (stream, read_error)
}

fn to_isolation(isolation: Isolation) -> HostConfigIsolationEnum {
    match isolation {
        Isolation::Default => HostConfigIsolationEnum::DEFAULT,
        Isolation::Process => HostConfigIsolationEnum::PROCESS,
        Isolation::HyperV => HostConfigIsolationEnum::HYPERV,
    }
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container runtime implementation using bollard.
///
/// Works against Linux and Windows Docker engines and against Podman's
/// Docker-compatible socket.
#[derive(Clone)]
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
}

impl BollardRuntime {
    /// Create a new BollardRuntime from a Docker client.
    pub fn new(client: Docker, runtime_type: RuntimeType) -> Self {
        Self {
            client,
            runtime_type,
        }
    }

    /// Connect to the engine at a detected endpoint.
    ///
    /// Unix sockets and Windows named pipes are both accepted.
    pub fn connect(endpoint: &RuntimeEndpoint, timeout: Duration) -> Result<Self, RuntimeInfoError> {
        let client = Docker::connect_with_local(
            &endpoint.socket_path,
            timeout.as_secs(),
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(Self::new(client, endpoint.runtime_type))
    }

    /// Get the runtime type (Docker or Podman).
    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }
}

impl std::fmt::Debug for BollardRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BollardRuntime")
            .field("runtime_type", &self.runtime_type)
            .finish()
    }
}

impl Sealed for BollardRuntime {}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        let name = match self.runtime_type {
            RuntimeType::Docker => "Docker".to_string(),
            RuntimeType::Podman => "Podman".to_string(),
        };

        Ok(RuntimeMetadata {
            name,
            version: info.server_version.unwrap_or_default(),
            api_version: bollard::API_DEFAULT_VERSION.to_string(),
            os: info.operating_system.unwrap_or_default(),
            os_type: info.os_type.unwrap_or_default(),
            arch: info.architecture.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let host_config = HostConfig {
            binds: if config.binds.is_empty() {
                None
            } else {
                Some(config.binds.clone())
            },
            isolation: config.isolation.map(to_isolation),
            ..Default::default()
        };

        let container_config = ContainerCreateBody {
            image: Some(config.image.to_string()),
            cmd: config.command.clone(),
            working_dir: config.working_dir.clone(),
            user: config.user.clone(),
            host_config: Some(host_config),
            ..Default::default()
        };

        let opts = CreateContainerOptions {
            name: config.name.clone(),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), container_config)
            .await
            .map_err(map_container_create_error)?;

        for warning in &response.warnings {
            tracing::warn!(container = %response.id, "create warning: {}", warning);
        }

        Ok(ContainerId::new(response.id))
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_not_found_error)?;

        Ok(())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let details = self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_container_not_found_error)?;

        let mounts = details
            .mounts
            .unwrap_or_default()
            .into_iter()
            .map(|m| MountPoint {
                name: m.name.unwrap_or_default(),
                source: m.source.unwrap_or_default(),
                destination: m.destination.unwrap_or_default(),
                driver: m.driver.filter(|d| !d.is_empty()),
                rw: m.rw.unwrap_or(true),
            })
            .collect();

        Ok(ContainerInfo {
            id: details
                .id
                .map(ContainerId::new)
                .unwrap_or_else(|| id.clone()),
            name: details
                .name
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            image: ImageId::new(details.image.unwrap_or_default()),
            mounts,
        })
    }

    async fn run_container(
        &self,
        id: &ContainerId,
        stdout: &mut OutputSink,
        stderr: &mut OutputSink,
    ) -> Result<i64, ContainerError> {
        // Attach before starting so no output is lost.
        let attach_opts = AttachContainerOptions {
            stdout: true,
            stderr: true,
            stream: true,
            ..Default::default()
        };
        let attached = self
            .client
            .attach_container(id.as_str(), Some(attach_opts))
            .await
            .map_err(map_container_not_found_error)?;
        let mut output = attached.output;

        self.client
            .start_container(id.as_str(), None::<StartContainerOptions>)
            .await
            .map_err(map_container_not_found_error)?;

        while let Some(item) = output.next().await {
            match item {
                Ok(bollard::container::LogOutput::StdOut { message }) => {
                    stdout.write_all(&message).await?;
                }
                Ok(bollard::container::LogOutput::StdErr { message }) => {
                    stderr.write_all(&message).await?;
                }
                Ok(_) => {}
                Err(e) => return Err(ContainerError::Runtime(e.to_string())),
            }
        }
        stdout.flush().await?;
        stderr.flush().await?;

        // bollard reports a non-zero exit as an error item on the wait stream.
        let mut exit_code = 0;
        let mut wait = self
            .client
            .wait_container(id.as_str(), None::<WaitContainerOptions>);
        while let Some(item) = wait.next().await {
            match item {
                Ok(response) => exit_code = response.status_code,
                Err(bollard::errors::Error::DockerContainerWaitError { code, .. }) => {
                    exit_code = code;
                }
                Err(e) => return Err(map_container_not_found_error(e)),
            }
        }

        Ok(exit_code)
    }
}

#[async_trait]
impl CopyOps for BollardRuntime {
    async fn copy_to_container(
        &self,
        id: &ContainerId,
        path: &str,
        archive: ArchiveReader,
    ) -> Result<(), CopyError> {
        let (body, read_error) = archive_stream(archive);

        let opts = UploadToContainerOptions {
            path: path.to_string(),
            ..Default::default()
        };

        let result = self
            .client
            .upload_to_container(id.as_str(), Some(opts), body_try_stream(body))
            .await;

        if let Some(e) = read_error.lock().ok().and_then(|mut slot| slot.take()) {
            return Err(CopyError::Stream(e));
        }
        result.map_err(map_upload_error)
    }
}
