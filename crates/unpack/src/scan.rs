//! Executable discovery in an extracted tree.

use std::path::{Path, PathBuf};

/// Finds a file named `target` (case-insensitive) under `root`.
///
/// Each directory is searched in two phases: all plain files first, then
/// each subdirectory in listing order, recursively. A match among a
/// directory's own files therefore always wins over anything deeper, even
/// when the deeper match's parent is listed first. Unreadable directories
/// are treated as empty rather than failing the whole search.
pub fn find_executable(root: &Path, target: &str) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %root.display(), error = %e, "skipping unreadable directory");
            return None;
        }
    };

    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            subdirs.push(path);
        } else if path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.eq_ignore_ascii_case(target))
        {
            return Some(path);
        }
    }

    subdirs
        .into_iter()
        .find_map(|dir| find_executable(&dir, target))
}
