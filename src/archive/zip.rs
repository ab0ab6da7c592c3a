// ABOUTME: Zip producer for the Tar Archive Builder.
// ABOUTME: Re-encodes zip entries as tar entries under the same rewrite, ownership, and filter rules.

use super::builder::{TarArchive, TarWriter, stamped_header};
use super::error::ArchiveError;
use super::path::{join, tar_path, to_tar_name};
use super::{FileFilter, Owner};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tar::EntryType;
use zip::ZipArchive;

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// Most bytes reserved up front for an entry; the declared size is untrusted.
const MAX_PREALLOC: u64 = 1 << 20;

fn initial_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

/// Archive the contents of the zip file `src` so that they extract at `dst`.
///
/// Entries keep zip order. The filter sees each entry's name inside the zip.
/// Without `owner` entries are owned by uid/gid 0; without `mode` the unix
/// permission bits recorded in the zip are kept (0755 for directories and
/// 0644 for files when the zip carries none).
pub fn read_zip_as_tar(
    src: &Path,
    dst: &str,
    owner: Option<Owner>,
    mode: Option<u32>,
    filter: Option<&FileFilter>,
) -> Result<TarArchive, ArchiveError> {
    let file = File::open(src).map_err(|source| ArchiveError::SourceUnreadable {
        path: src.to_path_buf(),
        source,
    })?;
    let mut zip = ZipArchive::new(file)?;

    let base = tar_path(dst);
    let owner = owner.unwrap_or(Owner::new(0, 0));
    let mut writer = TarWriter::new();

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;

        let enclosed = entry
            .enclosed_name()
            .ok_or_else(|| ArchiveError::UnsafePath(entry.name().to_string()))?
            .to_path_buf();

        if let Some(filter) = filter
            && !filter(&enclosed)
        {
            continue;
        }

        let name = join(&base, &to_tar_name(&enclosed)?);
        if name.is_empty() {
            continue;
        }

        let unix_mode = entry.unix_mode();
        let is_symlink = unix_mode.is_some_and(|m| m & S_IFMT == S_IFLNK);

        if entry.is_dir() {
            let perm = mode.unwrap_or_else(|| unix_mode.map_or(0o755, |m| m & 0o7777));
            let mut header = stamped_header(EntryType::Directory, perm, 0, owner);
            writer.append(&mut header, &name, std::io::empty())?;
        } else if is_symlink {
            let mut target = String::new();
            entry
                .read_to_string(&mut target)
                .map_err(|source| ArchiveError::Io {
                    path: enclosed.clone(),
                    source,
                })?;
            let perm = mode.unwrap_or(0o777);
            let mut header = stamped_header(EntryType::Symlink, perm, 0, owner);
            writer.append_symlink(&mut header, &name, &target)?;
        } else {
            let mut content = Vec::with_capacity(initial_capacity(entry.size()));
            entry
                .read_to_end(&mut content)
                .map_err(|source| ArchiveError::Io {
                    path: enclosed.clone(),
                    source,
                })?;
            let perm = mode.unwrap_or_else(|| unix_mode.map_or(0o644, |m| m & 0o7777));
            let mut header =
                stamped_header(EntryType::Regular, perm, content.len() as u64, owner);
            writer.append(&mut header, &name, content.as_slice())?;
        }
    }

    writer.finish()
}
