//! Status command implementation

use anyhow::Result;
use std::collections::BTreeSet;
use std::path::Path;
use troop_core::{discover_migrations, MigrationId};
use troop_migrate::{scan, Ledger, MigrationState};

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands::common::{load_project, open_ledger, ExitCode};

/// Scripts in `dir` with their applied flags, plus every recorded identifier.
///
/// Read-only: a missing ledger table means nothing has been applied yet and
/// is not created here.
async fn collect_states(
    ledger: &Ledger,
    dir: &Path,
) -> Result<(Vec<MigrationState>, Vec<MigrationId>)> {
    if !ledger.is_initialized().await? {
        let states = discover_migrations(dir)?
            .into_iter()
            .map(|unit| MigrationState {
                unit,
                applied: false,
            })
            .collect();
        return Ok((states, Vec::new()));
    }

    let states = scan(ledger, dir).await?;
    let recorded = ledger.applied().await?;
    Ok((states, recorded))
}

/// Execute the status command
pub async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let dir = project.migrations_dir(args.path.as_deref());
    let ledger = open_ledger(&project)?;

    let (states, recorded) = match collect_states(&ledger, &dir).await {
        Ok(found) => found,
        Err(e) => {
            println!("Error: {}", e);
            return Err(ExitCode(1).into());
        }
    };

    println!("Migrations in {}:", dir.display());
    let mut applied_count = 0;
    for state in &states {
        if state.applied {
            applied_count += 1;
            println!("  \u{2713} {}", state.unit.file_name);
        } else {
            println!("  - {} (pending)", state.unit.file_name);
        }
    }

    let on_disk: BTreeSet<&str> = states.iter().map(|s| s.unit.id.as_str()).collect();
    for id in recorded.iter().filter(|id| !on_disk.contains(id.as_str())) {
        println!("  ? {} (recorded, no file)", id);
    }

    println!();
    println!(
        "{} applied, {} pending",
        applied_count,
        states.len() - applied_count
    );
    Ok(())
}
