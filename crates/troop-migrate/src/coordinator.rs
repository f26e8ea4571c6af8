//! Run coordination: concurrent dispatch of pending migrations.
//!
//! Every pending unit gets its own task. A watcher task owns the tasks and
//! signals once all of them have finished; the coordinator races that signal
//! against the run's failure channel.

use crate::error::{MigrateError, MigrateResult};
use crate::executor::{run_unit, FailureReporter};
use crate::ledger::Ledger;
use crate::resolver::resolve_pending;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinSet;
use troop_core::{Config, FailurePolicy, LedgerMode, MigrationUnit};

/// Options controlling how a run dispatches and reports migrations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum number of migrations executing at once (0 = unbounded)
    pub max_concurrency: usize,

    /// First-failure-wins or collect every failure
    pub failure_policy: FailurePolicy,

    /// Ledger write ordering relative to script execution
    pub ledger_mode: LedgerMode,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RunOptions {
    /// Run options as configured in troop.yml
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            failure_policy: config.failure_policy,
            ledger_mode: config.ledger_mode,
        }
    }
}

/// Terminal outcome of a run
#[derive(Debug)]
pub enum RunOutcome {
    /// No pending migrations; nothing was dispatched
    NothingToMigrate,

    /// Every dispatched migration completed without error
    AllSucceeded { applied: usize },

    /// The first failure reported by any migration.
    ///
    /// Migrations still running when it arrived were left to finish on their
    /// own and their outcome is not part of the run.
    FirstFailureObserved(MigrateError),

    /// Every failure, collected after all migrations finished
    FailuresCollected(Vec<MigrateError>),
}

impl RunOutcome {
    /// Returns true unless the run observed a failure
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            RunOutcome::NothingToMigrate | RunOutcome::AllSucceeded { .. }
        )
    }

    /// Failures reported by the run, in the order they were observed
    pub fn failures(&self) -> Vec<&MigrateError> {
        match self {
            RunOutcome::FirstFailureObserved(err) => vec![err],
            RunOutcome::FailuresCollected(errs) => errs.iter().collect(),
            _ => Vec::new(),
        }
    }
}

/// Apply every pending migration in `dir` against `ledger`.
///
/// Ledger and directory errors abort the run before anything is dispatched.
pub async fn migrate(
    ledger: Arc<Ledger>,
    dir: &Path,
    options: RunOptions,
) -> MigrateResult<RunOutcome> {
    ledger.ensure_initialized().await?;
    let pending = resolve_pending(&ledger, dir).await?;
    Ok(run(ledger, pending, options).await)
}

/// Dispatch one task per pending unit and wait for the run's outcome.
pub async fn run(ledger: Arc<Ledger>, pending: Vec<MigrationUnit>, options: RunOptions) -> RunOutcome {
    if pending.is_empty() {
        return RunOutcome::NothingToMigrate;
    }

    let total = pending.len();
    let permits = match options.max_concurrency {
        0 => total,
        cap => cap.min(total),
    };
    let slots = match options.failure_policy {
        FailurePolicy::FirstFailure => 1,
        FailurePolicy::CollectAll => total,
    };
    log::debug!(
        "Dispatching {} migration(s), {} at a time, {}",
        total,
        permits,
        options.failure_policy
    );

    let semaphore = Arc::new(Semaphore::new(permits));
    let (tx, mut failures) = mpsc::channel(slots);
    let reporter = FailureReporter::new(tx);

    let mut tasks = JoinSet::new();
    for unit in pending {
        let ledger = Arc::clone(&ledger);
        let semaphore = Arc::clone(&semaphore);
        let reporter = reporter.clone();
        let mode = options.ledger_mode;

        tasks.spawn(async move {
            // The semaphore is never closed
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            run_unit(&ledger, &unit, mode, &reporter).await;
        });
    }

    let (done_tx, done_rx) = oneshot::channel();
    tokio::spawn(watch(tasks, reporter, done_tx));

    match options.failure_policy {
        FailurePolicy::FirstFailure => {
            tokio::select! {
                biased;
                Some(err) = failures.recv() => RunOutcome::FirstFailureObserved(err),
                _ = done_rx => match failures.try_recv() {
                    Ok(err) => RunOutcome::FirstFailureObserved(err),
                    Err(_) => RunOutcome::AllSucceeded { applied: total },
                },
            }
        }
        FailurePolicy::CollectAll => {
            let _ = done_rx.await;
            let mut collected = Vec::new();
            while let Ok(err) = failures.try_recv() {
                collected.push(err);
            }
            if collected.is_empty() {
                RunOutcome::AllSucceeded { applied: total }
            } else {
                RunOutcome::FailuresCollected(collected)
            }
        }
    }
}

/// Wait for every migration task, then signal `done`.
///
/// A task that panicked is reported as a failure.
async fn watch(mut tasks: JoinSet<()>, failures: FailureReporter, done: oneshot::Sender<()>) {
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            log::warn!("Migration task join error: {}", e);
            failures.report(MigrateError::TaskAborted {
                message: e.to_string(),
            });
        }
    }
    let _ = done.send(());
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
