//! Shared fixtures for migration engine tests.

use crate::ledger::Ledger;
use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use troop_db::{Database, DbError, DbResult, DuckDbBackend};

/// Script marker that makes [`InstrumentedDb`] wait for [`InstrumentedDb::release`]
pub(crate) const HOLD: &str = "-- hold";

/// Script marker that makes [`InstrumentedDb`] sleep before executing
pub(crate) const SLOW: &str = "-- slow";

/// Script marker that makes [`InstrumentedDb`] panic
pub(crate) const PANIC: &str = "-- panic";

/// In-memory DuckDB ledger using the default table name
pub(crate) async fn memory_ledger() -> Arc<Ledger> {
    let db: Arc<dyn Database> = Arc::new(DuckDbBackend::in_memory().unwrap());
    ledger_on(db).await
}

/// Initialized ledger on an existing handle
pub(crate) async fn ledger_on(db: Arc<dyn Database>) -> Arc<Ledger> {
    let ledger = Ledger::new(db, "migrations");
    ledger.ensure_initialized().await.unwrap();
    Arc::new(ledger)
}

/// Write `(file name, contents)` pairs into `dir`
pub(crate) fn write_scripts(dir: &Path, scripts: &[(&str, &str)]) {
    for (name, sql) in scripts {
        std::fs::write(dir.join(name), sql).unwrap();
    }
}

/// DuckDB wrapper that observes script execution.
///
/// Script batches are inspected for the marker comments above, and the
/// number of batches running at once is tracked.
pub(crate) struct InstrumentedDb {
    inner: DuckDbBackend,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    gate: Notify,
    broken_queries: AtomicBool,
}

impl InstrumentedDb {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: DuckDbBackend::in_memory().unwrap(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            gate: Notify::new(),
            broken_queries: AtomicBool::new(false),
        })
    }

    /// Highest number of script batches observed running at once
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Let a held script continue
    pub(crate) fn release(&self) {
        self.gate.notify_one();
    }

    /// Make every subsequent count query fail
    pub(crate) fn break_queries(&self) {
        self.broken_queries.store(true, Ordering::SeqCst);
    }

    async fn observe<F>(&self, sql: &str, run: F) -> DbResult<()>
    where
        F: Future<Output = DbResult<()>>,
    {
        if sql.contains(PANIC) {
            panic!("script requested a panic");
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if sql.contains(HOLD) {
            self.gate.notified().await;
        }
        if sql.contains(SLOW) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let result = run.await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl Database for InstrumentedDb {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.inner.execute(sql).await
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.observe(sql, self.inner.execute_batch(sql)).await
    }

    async fn execute_batch_in_transaction(&self, sql: &str) -> DbResult<()> {
        self.observe(sql, self.inner.execute_batch_in_transaction(sql))
            .await
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.inner.relation_exists(name).await
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        if self.broken_queries.load(Ordering::SeqCst) {
            return Err(DbError::ConnectionError("connection reset".to_string()));
        }
        self.inner.query_count(sql).await
    }

    async fn query_strings(&self, sql: &str) -> DbResult<Vec<String>> {
        self.inner.query_strings(sql).await
    }

    fn db_type(&self) -> &'static str {
        "instrumented-duckdb"
    }
}
