//! Pending migration resolution.
//!
//! Compares the scripts in a migration directory against the ledger and
//! selects the ones that still need to run.

use crate::error::{MigrateError, MigrateResult};
use crate::ledger::Ledger;
use std::path::Path;
use troop_core::{discover_migrations, CoreError, MigrationUnit};

/// A discovered migration together with its ledger state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationState {
    pub unit: MigrationUnit,
    pub applied: bool,
}

/// List every migration in `dir` with whether the ledger has recorded it.
///
/// Units keep the directory listing order (file-name order).
pub async fn scan(ledger: &Ledger, dir: &Path) -> MigrateResult<Vec<MigrationState>> {
    let units = discover_migrations(dir).map_err(|e| match e {
        CoreError::DirectoryUnreadable { path, source } => {
            MigrateError::DirectoryUnreadable { path, source }
        }
        other => MigrateError::DirectoryUnreadable {
            path: dir.display().to_string(),
            source: std::io::Error::other(other.to_string()),
        },
    })?;

    let mut states = Vec::with_capacity(units.len());
    for unit in units {
        let applied = ledger.has_applied(&unit.id).await?;
        states.push(MigrationState { unit, applied });
    }
    Ok(states)
}

/// The migrations in `dir` that the ledger has not recorded, in listing order.
///
/// An empty result means there is nothing to migrate.
pub async fn resolve_pending(ledger: &Ledger, dir: &Path) -> MigrateResult<Vec<MigrationUnit>> {
    let pending: Vec<MigrationUnit> = scan(ledger, dir)
        .await?
        .into_iter()
        .filter(|state| !state.applied)
        .map(|state| state.unit)
        .collect();
    log::debug!(
        "{} pending migration(s) in {}",
        pending.len(),
        dir.display()
    );
    Ok(pending)
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
