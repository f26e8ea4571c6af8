//! Single-migration execution.

use crate::error::{MigrateError, MigrateResult};
use crate::ledger::Ledger;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use troop_core::{LedgerMode, MigrationUnit};

/// Apply one migration unit: read its script, record it, execute it.
///
/// In [`LedgerMode::RecordFirst`] the ledger row is written before the script
/// runs, so a script that fails stays recorded and will not be retried by a
/// later run. In [`LedgerMode::Transactional`] both happen in one transaction.
pub async fn apply(ledger: &Ledger, unit: &MigrationUnit, mode: LedgerMode) -> MigrateResult<()> {
    let script = unit
        .read_script()
        .map_err(|source| MigrateError::ContentUnreadable {
            id: unit.id.clone(),
            path: unit.path.display().to_string(),
            source,
        })?;

    log::debug!("Applying {} ({})", unit.id, mode);
    match mode {
        LedgerMode::RecordFirst => {
            ledger.record_applied(&unit.id).await?;
            ledger
                .db()
                .execute_batch(&script)
                .await
                .map_err(|source| MigrateError::ExecutionFailed {
                    id: unit.id.clone(),
                    source,
                })?;
        }
        LedgerMode::Transactional => ledger.record_and_execute(&unit.id, &script).await?,
    }

    println!("Migrated: {}", unit.file_name);
    Ok(())
}

/// Failures that lose the race to be reported stay out of the default output.
pub(crate) const DROPPED_FAILURE_LEVEL: log::Level = log::Level::Debug;

/// Sending half of a run's failure channel.
///
/// Reporting never blocks: once the channel is full or the coordinator has
/// stopped listening, further failures are dropped.
#[derive(Debug, Clone)]
pub(crate) struct FailureReporter {
    tx: mpsc::Sender<MigrateError>,
}

impl FailureReporter {
    pub(crate) fn new(tx: mpsc::Sender<MigrateError>) -> Self {
        Self { tx }
    }

    pub(crate) fn report(&self, err: MigrateError) {
        match self.tx.try_send(err) {
            Ok(()) => {}
            Err(TrySendError::Full(err)) => {
                log::log!(
                    DROPPED_FAILURE_LEVEL,
                    "A failure was already reported, dropping: {err}"
                );
            }
            Err(TrySendError::Closed(err)) => {
                log::log!(DROPPED_FAILURE_LEVEL, "Run already finished, dropping: {err}");
            }
        }
    }
}

/// Apply `unit` and send any failure to the run's failure channel.
pub(crate) async fn run_unit(
    ledger: &Ledger,
    unit: &MigrationUnit,
    mode: LedgerMode,
    failures: &FailureReporter,
) {
    if let Err(e) = apply(ledger, unit, mode).await {
        log::debug!("Migration {} failed: {}", unit.id, e);
        failures.report(e);
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
