// ABOUTME: Tar Archive Builder: turns a directory, zip file, or in-memory files into a tar stream.
// ABOUTME: Rewrites paths to the destination, stamps ownership, and filters entries.

mod builder;
mod dir;
mod error;
mod path;
mod zip;

pub use builder::{ArchiveEntry, TarArchive, TarBuilder};
pub use dir::read_dir_as_tar;
pub use error::ArchiveError;
pub use path::{tar_path, win_path_to_tar_path};
pub use self::zip::read_zip_as_tar;

use crate::runtime::OsFamily;
use std::path::Path;
use std::sync::Arc;

/// Modification time stamped on every entry: 1980-01-01T00:00:01Z.
///
/// Identical inputs produce byte-identical archives.
pub const NORMALIZED_DATE_TIME: u64 = 315_532_801;

/// Permission bits forced onto directory payloads built on Windows hosts.
pub const WINDOWS_MODE: u32 = 0o777;

/// Ownership stamped onto archive entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Owner {
    pub uid: u64,
    pub gid: u64,
}

impl Owner {
    pub fn new(uid: u64, gid: u64) -> Self {
        Self { uid, gid }
    }
}

/// Inclusion predicate, called with the source path of every candidate entry.
pub type FileFilter = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Build a tar archive from `src`, which is either a directory or a zip file.
///
/// Entries land under `dst` (already in tar form, see [`tar_path`]). When the
/// host is Windows, directory payloads get [`WINDOWS_MODE`] instead of the
/// permission bits on disk.
pub fn archive_source(
    src: &Path,
    dst: &str,
    owner: Option<Owner>,
    filter: Option<&FileFilter>,
    host: OsFamily,
) -> Result<TarArchive, ArchiveError> {
    let metadata = std::fs::metadata(src).map_err(|source| ArchiveError::SourceUnreadable {
        path: src.to_path_buf(),
        source,
    })?;

    if metadata.is_dir() {
        let mode = match host {
            OsFamily::Windows => Some(WINDOWS_MODE),
            OsFamily::Linux => None,
        };
        return read_dir_as_tar(src, dst, owner, mode, filter);
    }

    read_zip_as_tar(src, dst, owner, None, filter)
}
