//! Ledger of applied migrations.
//!
//! The ledger is a single table of migration identifiers. Rows are only ever
//! inserted; Troop never updates or deletes them.

use crate::error::{MigrateError, MigrateResult};
use std::sync::Arc;
use troop_core::sql_utils::{quote_ident, quote_literal, quote_qualified, split_qualified_name};
use troop_core::MigrationId;
use troop_db::{Database, DbError};

/// Persistent record of applied migration identifiers
pub struct Ledger {
    db: Arc<dyn Database>,
    table: String,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("db", &self.db.db_type())
            .field("table", &self.table)
            .finish()
    }
}

fn unavailable(operation: &'static str) -> impl FnOnce(DbError) -> MigrateError {
    move |source| MigrateError::StoreUnavailable { operation, source }
}

impl Ledger {
    /// Create a ledger stored in `table` on the shared database handle
    pub fn new(db: Arc<dyn Database>, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
        }
    }

    /// Name of the ledger table
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The database handle shared with migration scripts
    pub fn db(&self) -> &Arc<dyn Database> {
        &self.db
    }

    /// Whether the ledger table exists
    pub async fn is_initialized(&self) -> MigrateResult<bool> {
        self.db
            .relation_exists(&self.table)
            .await
            .map_err(unavailable("check ledger table"))
    }

    /// Create the ledger table if it does not exist yet.
    ///
    /// An existing table is adopted as-is, whatever its constraints.
    pub async fn ensure_initialized(&self) -> MigrateResult<()> {
        if self.is_initialized().await? {
            return Ok(());
        }

        log::debug!("Creating ledger table {}", self.table);
        if let (Some(schema), _) = split_qualified_name(&self.table) {
            self.db
                .execute_batch(&format!(
                    "CREATE SCHEMA IF NOT EXISTS {}",
                    quote_qualified(schema)
                ))
                .await
                .map_err(unavailable("create ledger schema"))?;
        }
        self.db
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} (
                     migration  VARCHAR(256) NOT NULL UNIQUE,
                     applied_at TIMESTAMP NOT NULL DEFAULT now()
                 )",
                quote_qualified(&self.table)
            ))
            .await
            .map_err(unavailable("create ledger table"))
    }

    /// Whether `id` has been recorded as applied
    pub async fn has_applied(&self, id: &MigrationId) -> MigrateResult<bool> {
        let count = self
            .db
            .query_count(&format!(
                "SELECT {} FROM {} WHERE {} = {}",
                quote_ident("migration"),
                quote_qualified(&self.table),
                quote_ident("migration"),
                quote_literal(id)
            ))
            .await
            .map_err(unavailable("query ledger"))?;
        Ok(count > 0)
    }

    /// Record `id` as applied.
    ///
    /// Callers must not record the same identifier twice; tables created by
    /// [`ensure_initialized`](Self::ensure_initialized) reject the duplicate.
    pub async fn record_applied(&self, id: &MigrationId) -> MigrateResult<()> {
        self.db
            .execute(&self.insert_sql(id))
            .await
            .map_err(unavailable("record migration"))?;
        Ok(())
    }

    /// Record `id` and run `script` in one transaction.
    ///
    /// If either fails, neither takes effect and the error is attributed to
    /// the migration.
    pub async fn record_and_execute(&self, id: &MigrationId, script: &str) -> MigrateResult<()> {
        let batch = format!("{};\n{}", self.insert_sql(id), script);
        self.db
            .execute_batch_in_transaction(&batch)
            .await
            .map_err(|source| MigrateError::ExecutionFailed {
                id: id.clone(),
                source,
            })
    }

    /// Every recorded identifier, sorted
    pub async fn applied(&self) -> MigrateResult<Vec<MigrationId>> {
        let rows = self
            .db
            .query_strings(&format!(
                "SELECT {} FROM {} ORDER BY 1",
                quote_ident("migration"),
                quote_qualified(&self.table)
            ))
            .await
            .map_err(unavailable("list ledger"))?;
        Ok(rows.into_iter().filter_map(MigrationId::try_new).collect())
    }

    fn insert_sql(&self, id: &MigrationId) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_qualified(&self.table),
            quote_ident("migration"),
            quote_literal(id)
        )
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
