// ABOUTME: Container runtime access for Docker and Podman engines.
// ABOUTME: Capability traits, bollard implementation, and local detection.

mod bollard;
mod detection;
mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod traits;
mod types;

pub use self::bollard::BollardRuntime;
pub use detection::{DetectionError, detect_local};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use traits::{
    ArchiveReader, ContainerConfig, ContainerError, ContainerInfo, ContainerOps, CopyError,
    CopyOps, FullRuntime, Isolation, MountPoint, OsFamily, OutputSink, RuntimeInfo as RuntimeInfoTrait,
    RuntimeInfoError, RuntimeMetadata,
};
pub use types::{RuntimeConfig, RuntimeEndpoint, RuntimeType};
