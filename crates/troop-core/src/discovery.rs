//! Migration directory discovery.
//!
//! Lists the candidate scripts of a migration directory in file-name order.

use crate::error::{CoreError, CoreResult};
use crate::migration::MigrationUnit;
use std::path::Path;

/// Discover every candidate migration script in `dir`.
///
/// Only regular files (or symlinks to them) are considered; hidden files and
/// subdirectories are skipped. Entries are returned sorted by file name.
pub fn discover_migrations(dir: &Path) -> CoreResult<Vec<MigrationUnit>> {
    let unreadable = |source: std::io::Error| CoreError::DirectoryUnreadable {
        path: dir.display().to_string(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        // Follows symlinks, so a linked script counts as a file
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut units = Vec::with_capacity(paths.len());
    for path in paths {
        match MigrationUnit::from_path(&path) {
            Ok(unit) => units.push(unit),
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(units)
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod tests;
