//! troop-migrate - Migration engine for Troop
//!
//! Applies every pending migration script exactly once:
//!
//! - [`Ledger`] records which migration identifiers have been applied.
//! - [`resolver`] compares a migration directory against the ledger.
//! - [`executor`] applies a single migration unit.
//! - [`coordinator`] runs all pending units concurrently and decides the
//!   run's outcome.

pub mod coordinator;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod resolver;

#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::{migrate, run, RunOptions, RunOutcome};
pub use error::{MigrateError, MigrateResult};
pub use ledger::Ledger;
pub use resolver::{resolve_pending, scan, MigrationState};
