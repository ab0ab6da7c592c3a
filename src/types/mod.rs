// ABOUTME: Type-safe identifiers shared by the runtime and injection layers.
// ABOUTME: Uses phantom types so container and image IDs cannot be swapped.

mod id;

pub use id::{ContainerId, ImageId};
