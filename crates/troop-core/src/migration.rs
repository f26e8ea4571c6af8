//! Migration unit types.

use crate::error::{CoreError, CoreResult};
use crate::newtype_string::define_newtype_string;
use std::path::{Path, PathBuf};

define_newtype_string! {
    /// Strongly-typed wrapper for migration identifiers.
    ///
    /// An identifier is the part of a script's file name before the first `.`,
    /// so `001_init.sql` and `001_init.up.sql` both map to `001_init`.
    pub struct MigrationId;
}

impl MigrationId {
    /// Derive the identifier from a script file name.
    pub fn from_file_name(file_name: &str) -> CoreResult<Self> {
        let stem = file_name.split('.').next().unwrap_or_default();
        Self::try_new(stem).ok_or_else(|| CoreError::InvalidMigrationId {
            file_name: file_name.to_string(),
        })
    }
}

/// A migration script discovered on disk.
///
/// The script body is not held here: the executor reads it from `path` when
/// the unit is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationUnit {
    /// Identifier recorded in the ledger
    pub id: MigrationId,

    /// File name as listed in the migration directory
    pub file_name: String,

    /// Full path to the script
    pub path: PathBuf,
}

impl MigrationUnit {
    /// Build a unit for the script at `path`, deriving its identifier.
    pub fn from_path(path: &Path) -> CoreResult<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let id = MigrationId::from_file_name(&file_name)?;
        Ok(Self {
            id,
            file_name,
            path: path.to_path_buf(),
        })
    }

    /// Read the raw script content.
    pub fn read_script(&self) -> std::io::Result<String> {
        std::fs::read_to_string(&self.path)
    }
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
