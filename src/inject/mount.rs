// ABOUTME: Mount Resolver and destination classification for the compensated strategy.
// ABOUTME: Exact-match lookup of a container mount; no prefix or parent resolution.

use super::error::{InjectError, NoMatchingMountSnafu};
use crate::runtime::{ContainerInfo, MountPoint};
use snafu::OptionExt;

/// Filesystem node kind answered to the copy tool's "file or directory" prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

impl NodeKind {
    /// The single-letter answer `xcopy` expects.
    pub fn flag(self) -> &'static str {
        match self {
            NodeKind::File => "f",
            NodeKind::Directory => "d",
        }
    }
}

/// A Windows destination split into what it is and where its mount lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub kind: NodeKind,
    /// Path whose mount must be found: the parent for files, itself for directories.
    pub probe: String,
}

/// Classify a Windows destination path.
///
/// Config files (`*.toml`) are files; mounts are directory-granular, so
/// their probe path is the parent directory. Anything else is a directory
/// probed as-is.
pub fn classify_destination(destination: &str) -> Destination {
    if is_config_file(destination) {
        let probe = match destination.rfind('\\') {
            Some(idx) => destination[..idx].to_string(),
            None => String::new(),
        };
        Destination {
            kind: NodeKind::File,
            probe,
        }
    } else {
        Destination {
            kind: NodeKind::Directory,
            probe: destination.to_string(),
        }
    }
}

fn is_config_file(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".toml")
}

/// Find the mount whose destination is exactly `destination`.
///
/// The caller must already know the mount layout: a path below a mount
/// point does not match it.
pub fn find_mount<'a>(
    info: &'a ContainerInfo,
    destination: &str,
) -> Result<&'a MountPoint, InjectError> {
    info.mounts
        .iter()
        .find(|m| m.destination == destination)
        .context(NoMatchingMountSnafu { destination })
}
