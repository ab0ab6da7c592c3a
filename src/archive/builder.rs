// ABOUTME: In-memory tar construction shared by the directory, zip, and file producers.
// ABOUTME: TarBuilder collects entries; TarArchive is the finished byte stream.

use super::error::ArchiveError;
use super::{NORMALIZED_DATE_TIME, Owner};
use crate::runtime::ArchiveReader;
use std::io::{Cursor, Read};
use tar::{Builder, EntryType, Header};

/// A single regular file destined for an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Tar entry name (relative, forward slashes).
    pub path: String,
    /// Permission bits.
    pub mode: u32,
    /// Modification time in seconds since the epoch.
    pub mtime: u64,
    /// File content.
    pub content: Vec<u8>,
}

/// Collects files in memory and renders them as a tar archive.
///
/// Entries are written in insertion order with uid/gid 0, so the files end
/// up owned by whoever extracts them.
#[derive(Debug, Default)]
pub struct TarBuilder {
    entries: Vec<ArchiveEntry>,
}

impl TarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(
        &mut self,
        path: impl Into<String>,
        mode: u32,
        mtime: u64,
        content: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.entries.push(ArchiveEntry {
            path: path.into(),
            mode,
            mtime,
            content: content.into(),
        });
        self
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn build(&self) -> Result<TarArchive, ArchiveError> {
        let mut writer = TarWriter::new();
        for entry in &self.entries {
            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Regular);
            header.set_mode(entry.mode);
            header.set_mtime(entry.mtime);
            header.set_size(entry.content.len() as u64);
            writer.append(&mut header, &entry.path, entry.content.as_slice())?;
        }
        writer.finish()
    }
}

/// A fully built tar archive.
#[derive(Clone, PartialEq, Eq)]
pub struct TarArchive {
    bytes: Vec<u8>,
    entries: usize,
}

impl TarArchive {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of entries written.
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Readable stream over the archive bytes.
    pub fn into_reader(self) -> ArchiveReader {
        Box::new(Cursor::new(self.bytes))
    }
}

impl std::fmt::Debug for TarArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarArchive")
            .field("entries", &self.entries)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Thin wrapper over `tar::Builder` that counts entries as they are appended.
pub(crate) struct TarWriter {
    builder: Builder<Vec<u8>>,
    entries: usize,
}

impl TarWriter {
    pub(crate) fn new() -> Self {
        Self {
            builder: Builder::new(Vec::new()),
            entries: 0,
        }
    }

    /// Append an entry whose header already carries type, mode, and size.
    pub(crate) fn append<R: Read>(
        &mut self,
        header: &mut Header,
        name: &str,
        data: R,
    ) -> Result<(), ArchiveError> {
        self.builder
            .append_data(header, name, data)
            .map_err(ArchiveError::Write)?;
        self.entries += 1;
        Ok(())
    }

    pub(crate) fn append_symlink(
        &mut self,
        header: &mut Header,
        name: &str,
        target: &str,
    ) -> Result<(), ArchiveError> {
        header.set_entry_type(EntryType::Symlink);
        header.set_size(0);
        self.builder
            .append_link(header, name, target)
            .map_err(ArchiveError::Write)?;
        self.entries += 1;
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<TarArchive, ArchiveError> {
        let bytes = self.builder.into_inner().map_err(ArchiveError::Write)?;
        Ok(TarArchive {
            bytes,
            entries: self.entries,
        })
    }
}

/// Header with normalized mtime and the requested ownership.
pub(crate) fn stamped_header(entry_type: EntryType, mode: u32, size: u64, owner: Owner) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mode(mode);
    header.set_size(size);
    header.set_mtime(NORMALIZED_DATE_TIME);
    header.set_uid(owner.uid);
    header.set_gid(owner.gid);
    header
}
