// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: RuntimeMetadata, ContainerConfig, ContainerInfo, MountPoint, sinks.

use crate::types::{ContainerId, ImageId};
use tokio::io::{AsyncRead, AsyncWrite};

/// Destination for a container's stdout or stderr.
pub type OutputSink = dyn AsyncWrite + Send + Unpin;

/// A tar stream handed to [`CopyOps::copy_to_container`](super::CopyOps).
pub type ArchiveReader = Box<dyn AsyncRead + Send + Unpin>;

/// Runtime metadata.
#[derive(Debug, Clone)]
pub struct RuntimeMetadata {
    /// Runtime name (e.g., "Docker", "Podman").
    pub name: String,
    /// Engine version.
    pub version: String,
    /// API version.
    pub api_version: String,
    /// Operating system description (e.g., "Windows Server 2022 Datacenter").
    pub os: String,
    /// Operating system family reported by the engine ("linux" or "windows").
    pub os_type: String,
    /// Architecture.
    pub arch: String,
}

impl RuntimeMetadata {
    /// The container OS family the engine runs.
    pub fn os_family(&self) -> OsFamily {
        OsFamily::from_os_type(&self.os_type)
    }
}

/// Container operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Linux,
    Windows,
}

impl OsFamily {
    /// Classify an engine `OSType` value. Anything but "windows" is Linux.
    pub fn from_os_type(os_type: &str) -> Self {
        if os_type.eq_ignore_ascii_case("windows") {
            OsFamily::Windows
        } else {
            OsFamily::Linux
        }
    }

    /// The family of the host this process runs on.
    pub fn host() -> Self {
        if cfg!(windows) {
            OsFamily::Windows
        } else {
            OsFamily::Linux
        }
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OsFamily::Linux => write!(f, "linux"),
            OsFamily::Windows => write!(f, "windows"),
        }
    }
}

/// Configuration for creating a container.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Optional name; the engine generates one when absent.
    pub name: Option<String>,
    /// Image to create the container from.
    pub image: ImageId,
    /// Command to run (overrides image CMD).
    pub command: Option<Vec<String>>,
    /// Working directory.
    pub working_dir: Option<String>,
    /// User to run as.
    pub user: Option<String>,
    /// Bind specs in `source:destination` form.
    pub binds: Vec<String>,
    /// Isolation technology (Windows engines only).
    pub isolation: Option<Isolation>,
}

impl ContainerConfig {
    /// Minimal configuration for the given image.
    pub fn new(image: ImageId) -> Self {
        Self {
            name: None,
            image,
            command: None,
            working_dir: None,
            user: None,
            binds: Vec::new(),
            isolation: None,
        }
    }
}

/// Container isolation technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    Default,
    Process,
    HyperV,
}

/// Information about a container, as returned by inspect.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Container ID.
    pub id: ContainerId,
    /// Container name.
    pub name: String,
    /// Image ID the container was created from.
    pub image: ImageId,
    /// Mounts attached to the container.
    pub mounts: Vec<MountPoint>,
}

/// A bind or volume mount attached to a container.
///
/// Snapshot taken at inspection time; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    /// Volume name (empty for plain binds).
    pub name: String,
    /// Host-side source.
    pub source: String,
    /// Path inside the container.
    pub destination: String,
    /// Volume driver, if any.
    pub driver: Option<String>,
    /// Whether the mount is writable.
    pub rw: bool,
}

impl MountPoint {
    /// Bind spec that reproduces this mount in another container.
    ///
    /// Named volumes bind by name; plain binds fall back to the host source.
    pub fn bind_spec(&self) -> String {
        let source = if self.name.is_empty() {
            &self.source
        } else {
            &self.name
        };
        format!("{}:{}", source, self.destination)
    }
}
