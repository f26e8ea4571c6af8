//! Migrate command implementation

use anyhow::Result;
use troop_core::{FailurePolicy, LedgerMode};
use troop_migrate::{RunOptions, RunOutcome};

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::{load_project, open_ledger, ExitCode};

/// Merge command-line overrides into the configured run options.
fn resolve_run_options(base: RunOptions, args: &MigrateArgs) -> RunOptions {
    let mut options = base;
    if let Some(jobs) = args.jobs {
        options.max_concurrency = jobs;
    }
    if args.collect_failures {
        options.failure_policy = FailurePolicy::CollectAll;
    }
    if args.transactional {
        options.ledger_mode = LedgerMode::Transactional;
    }
    options
}

/// Execute the migrate command
pub async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let dir = project.migrations_dir(args.path.as_deref());
    let ledger = open_ledger(&project)?;
    let options = resolve_run_options(RunOptions::from_config(&project.config), args);

    if global.verbose {
        println!(
            "Migrating {} (ledger: {}, jobs: {}, {}, {})",
            dir.display(),
            ledger.table(),
            options.max_concurrency,
            options.failure_policy,
            options.ledger_mode
        );
    }

    let outcome = match troop_migrate::migrate(ledger, &dir, options).await {
        Ok(outcome) => outcome,
        Err(e) => {
            println!("Error: {}", e);
            return Err(ExitCode(1).into());
        }
    };

    match outcome {
        RunOutcome::NothingToMigrate => println!("Nothing to migrate."),
        RunOutcome::AllSucceeded { .. } => println!("All done!"),
        RunOutcome::FirstFailureObserved(e) => {
            println!("Error: {}", e);
            return Err(ExitCode(1).into());
        }
        RunOutcome::FailuresCollected(errors) => {
            for e in &errors {
                println!("Error: {}", e);
            }
            return Err(ExitCode(1).into());
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "migrate_test.rs"]
mod tests;
