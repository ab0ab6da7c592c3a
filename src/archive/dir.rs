// ABOUTME: Directory producer for the Tar Archive Builder.
// ABOUTME: Walks a tree in name order and re-roots every entry under the destination.

use super::builder::{TarArchive, TarWriter};
use super::error::ArchiveError;
use super::path::{join, tar_path, to_tar_name};
use super::{FileFilter, NORMALIZED_DATE_TIME, Owner};
use std::fs::{self, File};
use std::path::Path;
use tar::{EntryType, Header, HeaderMode};
use walkdir::WalkDir;

/// Archive the directory `src` so that it extracts at `dst`.
///
/// Every entry, including `src` itself, is renamed from `src/...` to
/// `dst/...`, stamped with `owner` when given, and skipped when `filter`
/// rejects its source path. A rejected directory only drops that directory's
/// own entry; its children are still considered. `mode` replaces the
/// permission bits on disk. Symlinks are archived as links, not followed.
pub fn read_dir_as_tar(
    src: &Path,
    dst: &str,
    owner: Option<Owner>,
    mode: Option<u32>,
    filter: Option<&FileFilter>,
) -> Result<TarArchive, ArchiveError> {
    let base = tar_path(dst);
    let mut writer = TarWriter::new();

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();

        if let Some(filter) = filter
            && !filter(path)
        {
            continue;
        }

        let name = join(&base, &relative_name(src, path)?);
        if name.is_empty() {
            // Extracting at the root: there is no entry for the root itself.
            continue;
        }

        let metadata = entry.metadata()?;
        let mut header = Header::new_gnu();
        header.set_metadata_in_mode(&metadata, HeaderMode::Complete);
        header.set_mtime(NORMALIZED_DATE_TIME);
        if let Some(mode) = mode {
            header.set_mode(mode);
        }
        if let Some(owner) = owner {
            header.set_uid(owner.uid);
            header.set_gid(owner.gid);
        }

        let file_type = entry.file_type();
        if file_type.is_dir() {
            header.set_entry_type(EntryType::Directory);
            header.set_size(0);
            writer.append(&mut header, &name, std::io::empty())?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(path).map_err(|source| ArchiveError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let target = target
                .to_str()
                .ok_or_else(|| ArchiveError::UnsafePath(target.display().to_string()))?
                .replace('\\', "/");
            writer.append_symlink(&mut header, &name, &target)?;
        } else {
            let file = File::open(path).map_err(|source| ArchiveError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            header.set_entry_type(EntryType::Regular);
            header.set_size(metadata.len());
            writer.append(&mut header, &name, file)?;
        }
    }

    writer.finish()
}

/// `path` relative to `root`, as a forward-slash tar name.
fn relative_name(root: &Path, path: &Path) -> Result<String, ArchiveError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| ArchiveError::UnsafePath(path.display().to_string()))?;
    to_tar_name(relative)
}
