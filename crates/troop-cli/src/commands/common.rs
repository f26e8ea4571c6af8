//! Shared helpers for CLI commands: project loading and database wiring.

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use troop_core::{Config, DbType};
use troop_db::{Database, DuckDbBackend};
use troop_migrate::Ledger;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the command has already printed its message.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Project directory, configuration, and resolved target for one invocation
#[derive(Debug)]
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
    pub(crate) target: Option<String>,
}

impl Project {
    /// Migration directory: `--path` (relative to the working directory) or
    /// the configured `migrations_path` (relative to the project directory).
    pub(crate) fn migrations_dir(&self, path_override: Option<&str>) -> PathBuf {
        match path_override {
            Some(path) => PathBuf::from(path),
            None => self.config.migrations_path_absolute(&self.root),
        }
    }
}

/// Load the project configuration for the given global arguments.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let root = PathBuf::from(&global.project_dir);
    let config = match &global.config {
        Some(path) => Config::load(Path::new(path)),
        None => Config::load_from_dir(&root),
    }
    .context("Failed to load configuration")?;
    let target = Config::resolve_target(global.target.as_deref());

    Ok(Project {
        root,
        config,
        target,
    })
}

/// Open the database configured for the project's target.
pub(crate) fn create_database_connection(project: &Project) -> Result<Arc<dyn Database>> {
    let db_config = project
        .config
        .get_database_config(project.target.as_deref())
        .context("Failed to get database configuration")?;
    let path = db_config.path_absolute(&project.root);
    log::debug!("Connecting to {} database at {}", db_config.db_type, path);

    let db: Arc<dyn Database> = match db_config.db_type {
        DbType::DuckDb => {
            Arc::new(DuckDbBackend::new(&path).context("Failed to connect to database")?)
        }
    };
    Ok(db)
}

/// Build the ledger for the project's target on a fresh connection.
pub(crate) fn open_ledger(project: &Project) -> Result<Arc<Ledger>> {
    let db = create_database_connection(project)?;
    let table = project
        .config
        .get_ledger_table(project.target.as_deref())
        .context("Failed to resolve ledger table")?;
    Ok(Arc::new(Ledger::new(db, table)))
}
