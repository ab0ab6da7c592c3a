// ABOUTME: Path rewriting between runtime-native destinations and tar entry names.
// ABOUTME: Tar names always use forward slashes and are relative to the extraction root.

use super::error::ArchiveError;
use std::path::{Component, Path};

/// Convert a destination path into a tar entry name.
///
/// Backslashes become forward slashes and leading/trailing slashes are
/// dropped: `/workspace/app/` becomes `workspace/app`.
pub fn tar_path(path: &str) -> String {
    path.replace('\\', "/")
        .trim_matches('/')
        .to_string()
}

/// Convert a Windows destination into a tar entry name.
///
/// The volume prefix (drive letter and colon) is stripped and separators
/// are normalized: `C:\windows\layers\x.toml` becomes `windows/layers/x.toml`.
pub fn win_path_to_tar_path(path: &str) -> String {
    let bytes = path.as_bytes();
    let without_volume = if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
    {
        &path[2..]
    } else {
        path
    };
    tar_path(without_volume)
}

/// Render a relative path as a tar name, rejecting anything that escapes it.
pub(crate) fn to_tar_name(relative: &Path) -> Result<String, ArchiveError> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| ArchiveError::UnsafePath(relative.display().to_string()))?,
            ),
            Component::CurDir => {}
            _ => return Err(ArchiveError::UnsafePath(relative.display().to_string())),
        }
    }
    Ok(parts.join("/"))
}

/// Join a tar base name and a relative child name.
pub(crate) fn join(base: &str, child: &str) -> String {
    match (base.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{base}/{child}"),
    }
}
