// ABOUTME: Composable capability traits for container runtimes.
// ABOUTME: Defines RuntimeInfo, ContainerOps, CopyOps and the FullRuntime bundle.

mod container;
mod copy;
mod runtime_info;
pub(crate) mod sealed;
mod shared_types;

pub use container::{ContainerError, ContainerOps};
pub use copy::{CopyError, CopyOps};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;

/// Everything an injection needs from a runtime.
///
/// Implemented automatically for any type that provides all three
/// capabilities, so `Arc<dyn FullRuntime>` is the handle operations receive.
pub trait FullRuntime: RuntimeInfo + ContainerOps + CopyOps {}

impl<T> FullRuntime for T where T: RuntimeInfo + ContainerOps + CopyOps + ?Sized {}
