//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;

/// Database abstraction trait for Troop
///
/// A single handle is shared by every concurrently running migration, so
/// implementations must be Send + Sync and each call must be atomic with
/// respect to calls made from other tasks.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute a single SQL statement, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute multiple SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Execute multiple SQL statements inside one transaction.
    ///
    /// Either every statement takes effect or none does.
    async fn execute_batch_in_transaction(&self, sql: &str) -> DbResult<()>;

    /// Check if a table or view exists.
    ///
    /// Unqualified names are looked up in the connection's current schema.
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Execute query returning row count
    async fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// Execute query and return the first column of every row as a string
    async fn query_strings(&self, sql: &str) -> DbResult<Vec<String>>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
