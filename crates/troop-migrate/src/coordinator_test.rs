use super::*;
use crate::test_support::{
    ledger_on, memory_ledger, write_scripts, InstrumentedDb, HOLD, PANIC, SLOW,
};
use std::time::Duration;
use tempfile::TempDir;
use troop_core::MigrationId;

fn id(s: &str) -> MigrationId {
    MigrationId::try_new(s).unwrap()
}

fn options(max_concurrency: usize, failure_policy: FailurePolicy) -> RunOptions {
    RunOptions {
        max_concurrency,
        failure_policy,
        ledger_mode: LedgerMode::RecordFirst,
    }
}

async fn ledger_rows(ledger: &Ledger) -> usize {
    ledger
        .db()
        .query_count("SELECT * FROM migrations")
        .await
        .unwrap()
}

#[test]
fn test_default_options_follow_config_defaults() {
    let opts = RunOptions::default();
    assert_eq!(opts.max_concurrency, 8);
    assert_eq!(opts.failure_policy, FailurePolicy::FirstFailure);
    assert_eq!(opts.ledger_mode, LedgerMode::RecordFirst);
}

#[tokio::test]
async fn test_empty_pending_set_dispatches_nothing() {
    let db = InstrumentedDb::new();
    let ledger = ledger_on(db.clone()).await;

    let outcome = run(ledger, Vec::new(), RunOptions::default()).await;

    assert!(matches!(outcome, RunOutcome::NothingToMigrate));
    assert!(outcome.is_success());
    assert_eq!(db.max_in_flight(), 0);
}

#[tokio::test]
async fn test_single_script_applied() {
    let dir = TempDir::new().unwrap();
    write_scripts(
        dir.path(),
        &[(
            "001_init.sql",
            "CREATE TABLE users (id INT); INSERT INTO users VALUES (1);",
        )],
    );
    let ledger = memory_ledger().await;

    let outcome = migrate(Arc::clone(&ledger), dir.path(), RunOptions::default())
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::AllSucceeded { applied: 1 }));
    assert!(ledger.has_applied(&id("001_init")).await.unwrap());
    assert_eq!(
        ledger
            .db()
            .query_count("SELECT * FROM users")
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_second_run_applies_nothing() {
    let dir = TempDir::new().unwrap();
    write_scripts(
        dir.path(),
        &[
            ("001_a.sql", "CREATE TABLE a (id INT);"),
            ("002_b.sql", "CREATE TABLE b (id INT);"),
        ],
    );
    let ledger = memory_ledger().await;

    let first = migrate(Arc::clone(&ledger), dir.path(), RunOptions::default())
        .await
        .unwrap();
    assert!(matches!(first, RunOutcome::AllSucceeded { applied: 2 }));

    let second = migrate(Arc::clone(&ledger), dir.path(), RunOptions::default())
        .await
        .unwrap();
    assert!(matches!(second, RunOutcome::NothingToMigrate));
    assert_eq!(ledger_rows(&ledger).await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_scripts_each_recorded_once() {
    let dir = TempDir::new().unwrap();
    let scripts: Vec<(String, String)> = (0..20)
        .map(|i| {
            (
                format!("{:03}_t{}.sql", i, i),
                format!("CREATE TABLE t{} (id INT);", i),
            )
        })
        .collect();
    let refs: Vec<(&str, &str)> = scripts
        .iter()
        .map(|(n, s)| (n.as_str(), s.as_str()))
        .collect();
    write_scripts(dir.path(), &refs);
    let ledger = memory_ledger().await;

    let outcome = migrate(
        Arc::clone(&ledger),
        dir.path(),
        options(0, FailurePolicy::FirstFailure),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, RunOutcome::AllSucceeded { applied: 20 }));
    let distinct = ledger
        .db()
        .query_count("SELECT DISTINCT migration FROM migrations")
        .await
        .unwrap();
    assert_eq!(distinct, 20);
    assert_eq!(ledger_rows(&ledger).await, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_invalid_script_reported_and_recorded() {
    let dir = TempDir::new().unwrap();
    write_scripts(
        dir.path(),
        &[
            ("a.sql", "CREATE TABLE a (id INT);"),
            ("b.sql", "CREATE TABEL b (id INT);"),
        ],
    );
    let ledger = memory_ledger().await;

    let outcome = migrate(Arc::clone(&ledger), dir.path(), RunOptions::default())
        .await
        .unwrap();

    assert!(!outcome.is_success());
    assert_eq!(outcome.failures().len(), 1);
    // Record-first: b is marked applied although its statements failed
    assert!(ledger.has_applied(&id("b")).await.unwrap());
    assert!(!ledger.db().relation_exists("b").await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_transactional_mode_leaves_failed_script_unrecorded() {
    let dir = TempDir::new().unwrap();
    write_scripts(
        dir.path(),
        &[
            ("a.sql", "CREATE TABLE a (id INT);"),
            ("b.sql", "CREATE TABEL b (id INT);"),
        ],
    );
    let ledger = memory_ledger().await;
    let opts = RunOptions {
        max_concurrency: 0,
        failure_policy: FailurePolicy::CollectAll,
        ledger_mode: LedgerMode::Transactional,
    };

    let outcome = migrate(Arc::clone(&ledger), dir.path(), opts)
        .await
        .unwrap();

    let failures = outcome.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].migration_id(), Some(&id("b")));
    assert!(ledger.has_applied(&id("a")).await.unwrap());
    assert!(!ledger.has_applied(&id("b")).await.unwrap());
}

#[tokio::test]
async fn test_already_applied_unit_never_executed() {
    let dir = TempDir::new().unwrap();
    write_scripts(
        dir.path(),
        &[
            // Would fail if it were executed again
            ("001_done.sql", "THIS IS NOT SQL;"),
            ("002_new.sql", "CREATE TABLE fresh (id INT);"),
        ],
    );
    let ledger = memory_ledger().await;
    ledger.record_applied(&id("001_done")).await.unwrap();

    let outcome = migrate(Arc::clone(&ledger), dir.path(), RunOptions::default())
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::AllSucceeded { applied: 1 }));
    let done_rows = ledger
        .db()
        .query_count("SELECT * FROM migrations WHERE migration = '001_done'")
        .await
        .unwrap();
    assert_eq!(done_rows, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_collect_all_reports_every_failure() {
    let dir = TempDir::new().unwrap();
    write_scripts(
        dir.path(),
        &[
            ("001_ok.sql", "CREATE TABLE ok (id INT);"),
            ("002_bad.sql", "CREAT TABLE x (id INT);"),
            ("003_bad.sql", "DROP TABLE missing_table;"),
        ],
    );
    let ledger = memory_ledger().await;

    let outcome = migrate(
        Arc::clone(&ledger),
        dir.path(),
        options(0, FailurePolicy::CollectAll),
    )
    .await
    .unwrap();

    let errors = match outcome {
        RunOutcome::FailuresCollected(errors) => errors,
        other => panic!("expected collected failures, got {:?}", other),
    };
    let mut failed: Vec<String> = errors
        .iter()
        .filter_map(|e| e.migration_id().map(|id| id.to_string()))
        .collect();
    failed.sort();
    assert_eq!(failed, vec!["002_bad", "003_bad"]);
    assert!(ledger.db().relation_exists("ok").await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unbounded_runs_everything_at_once() {
    let dir = TempDir::new().unwrap();
    let scripts: Vec<(String, String)> = (0..6)
        .map(|i| {
            (
                format!("{}.sql", i),
                format!("{SLOW}\nCREATE TABLE t{i} (id INT);"),
            )
        })
        .collect();
    let refs: Vec<(&str, &str)> = scripts
        .iter()
        .map(|(n, s)| (n.as_str(), s.as_str()))
        .collect();
    write_scripts(dir.path(), &refs);
    let db = InstrumentedDb::new();
    let ledger = ledger_on(db.clone()).await;

    let outcome = migrate(ledger, dir.path(), options(0, FailurePolicy::FirstFailure))
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::AllSucceeded { applied: 6 }));
    assert_eq!(db.max_in_flight(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_cap_respected() {
    let dir = TempDir::new().unwrap();
    let scripts: Vec<(String, String)> = (0..6)
        .map(|i| {
            (
                format!("{}.sql", i),
                format!("{SLOW}\nCREATE TABLE t{i} (id INT);"),
            )
        })
        .collect();
    let refs: Vec<(&str, &str)> = scripts
        .iter()
        .map(|(n, s)| (n.as_str(), s.as_str()))
        .collect();
    write_scripts(dir.path(), &refs);
    let db = InstrumentedDb::new();
    let ledger = ledger_on(db.clone()).await;

    let outcome = migrate(
        Arc::clone(&ledger),
        dir.path(),
        options(2, FailurePolicy::FirstFailure),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, RunOutcome::AllSucceeded { applied: 6 }));
    assert!(db.max_in_flight() <= 2);
    assert_eq!(ledger_rows(&ledger).await, 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_first_failure_returns_without_waiting_for_others() {
    let dir = TempDir::new().unwrap();
    let slow = format!("{HOLD}\nCREATE TABLE slow (id INT);");
    write_scripts(
        dir.path(),
        &[
            ("001_slow.sql", slow.as_str()),
            ("002_bad.sql", "CREAT TABLE nope (id INT);"),
        ],
    );
    let db = InstrumentedDb::new();
    let ledger = ledger_on(db.clone()).await;

    let outcome = migrate(
        Arc::clone(&ledger),
        dir.path(),
        options(0, FailurePolicy::FirstFailure),
    )
    .await
    .unwrap();

    let err = match outcome {
        RunOutcome::FirstFailureObserved(err) => err,
        other => panic!("expected first failure, got {:?}", other),
    };
    assert_eq!(err.migration_id(), Some(&id("002_bad")));
    assert!(!ledger.db().relation_exists("slow").await.unwrap());

    // The held migration keeps running in the background once released
    db.release();
    let mut finished = false;
    for _ in 0..200 {
        if ledger.db().relation_exists("slow").await.unwrap() {
            finished = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(finished, "held migration never completed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_panicking_task_reported_as_failure() {
    let dir = TempDir::new().unwrap();
    let boom = format!("{PANIC}\nCREATE TABLE boom (id INT);");
    write_scripts(
        dir.path(),
        &[
            ("001_ok.sql", "CREATE TABLE ok (id INT);"),
            ("002_boom.sql", boom.as_str()),
        ],
    );
    let db = InstrumentedDb::new();
    let ledger = ledger_on(db.clone()).await;

    let outcome = migrate(ledger, dir.path(), options(0, FailurePolicy::CollectAll))
        .await
        .unwrap();

    let failures = outcome.failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], MigrateError::TaskAborted { .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinked_script_is_applied() {
    let dir = TempDir::new().unwrap();
    let shared = TempDir::new().unwrap();
    let target = shared.path().join("init.sql");
    std::fs::write(&target, "CREATE TABLE linked (id INT);").unwrap();
    std::os::unix::fs::symlink(&target, dir.path().join("001_linked.sql")).unwrap();
    let ledger = memory_ledger().await;

    let outcome = migrate(Arc::clone(&ledger), dir.path(), RunOptions::default())
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::AllSucceeded { applied: 1 }));
    assert!(ledger.has_applied(&id("001_linked")).await.unwrap());
    assert!(ledger.db().relation_exists("linked").await.unwrap());
}

#[tokio::test]
async fn test_missing_directory_aborts_before_dispatch() {
    let dir = TempDir::new().unwrap();
    let ledger = memory_ledger().await;

    let err = migrate(ledger, &dir.path().join("absent"), RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::DirectoryUnreadable { .. }));
}

#[tokio::test]
async fn test_ledger_failure_aborts_before_dispatch() {
    let dir = TempDir::new().unwrap();
    write_scripts(dir.path(), &[("001_a.sql", "CREATE TABLE a (id INT);")]);
    let db = InstrumentedDb::new();
    let ledger = ledger_on(db.clone()).await;
    db.break_queries();

    let err = migrate(ledger, dir.path(), RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::StoreUnavailable { .. }));
    assert_eq!(db.max_in_flight(), 0);
}
