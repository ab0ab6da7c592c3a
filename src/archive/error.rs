// ABOUTME: Error type for archive construction.
// ABOUTME: Distinguishes an unreadable source from failures while building the stream.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("source '{}' is unreadable: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("reading '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("walking directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("reading zip archive: {0}")]
    Zip(#[from] ::zip::result::ZipError),

    #[error("unsafe entry path '{0}'")]
    UnsafePath(String),

    #[error("writing tar stream: {0}")]
    Write(std::io::Error),
}
