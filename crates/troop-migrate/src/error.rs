//! Error types for troop-migrate

use thiserror::Error;
use troop_core::MigrationId;
use troop_db::DbError;

/// Migration engine errors
#[derive(Error, Debug)]
pub enum MigrateError {
    /// M001: The ledger table could not be checked, created, queried, or written
    #[error("[M001] Ledger unavailable ({operation}): {source}")]
    StoreUnavailable {
        operation: &'static str,
        #[source]
        source: DbError,
    },

    /// M002: The migration directory could not be listed
    #[error("[M002] Cannot read migration directory {path}: {source}")]
    DirectoryUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// M003: A migration script could not be read
    #[error("[M003] Cannot read migration {id} at {path}: {source}")]
    ContentUnreadable {
        id: MigrationId,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// M004: The database rejected a migration script
    #[error("[M004] Migration {id} failed: {source}")]
    ExecutionFailed {
        id: MigrationId,
        #[source]
        source: DbError,
    },

    /// M005: A migration task panicked or was cancelled
    #[error("[M005] Migration task aborted: {message}")]
    TaskAborted { message: String },
}

impl MigrateError {
    /// The migration this error is attributable to, if any
    pub fn migration_id(&self) -> Option<&MigrationId> {
        match self {
            MigrateError::ContentUnreadable { id, .. } | MigrateError::ExecutionFailed { id, .. } => {
                Some(id)
            }
            _ => None,
        }
    }
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;
