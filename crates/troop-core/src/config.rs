//! Configuration types and parsing for troop.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default DuckDB database path
const DEFAULT_DB_PATH: &str = "./troop.duckdb";

/// Default ledger table name
const DEFAULT_LEDGER_TABLE: &str = "migrations";

/// Default migration directory, relative to the project directory
const DEFAULT_MIGRATIONS_PATH: &str = "migrations";

/// Default cap on concurrently executing migrations
const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Environment variable consulted when no `--target` flag is given
const TARGET_ENV_VAR: &str = "TROOP_TARGET";

/// Main project configuration from troop.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory containing migration scripts
    #[serde(default = "default_migrations_path")]
    pub migrations_path: String,

    /// Table recording applied migrations
    #[serde(default = "default_ledger_table")]
    pub ledger_table: String,

    /// Maximum number of migrations executing at once (0 = unbounded)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// How failures from concurrent migrations are reported
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Whether the ledger row and the script share a transaction
    #[serde(default)]
    pub ledger_mode: LedgerMode,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Named target configurations (e.g., dev, staging, prod)
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Database configuration override
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Ledger table override
    #[serde(default)]
    pub ledger_table: Option<String>,
}

/// Database type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// DuckDB (default)
    #[default]
    DuckDb,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database type
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// Database path (file-based or :memory:)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            path: default_db_path(),
        }
    }
}

impl DatabaseConfig {
    /// Resolve the database path against the project root.
    ///
    /// `:memory:` and absolute paths are returned unchanged.
    pub fn path_absolute(&self, root: &Path) -> String {
        if self.path == ":memory:" || Path::new(&self.path).is_absolute() {
            self.path.clone()
        } else {
            root.join(&self.path).display().to_string()
        }
    }
}

/// Failure aggregation policy for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the first failure observed and return immediately
    #[default]
    FirstFailure,
    /// Wait for every migration and report all failures
    CollectAll,
}

/// How a migration's ledger row relates to its script execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LedgerMode {
    /// Record the migration, then execute the script. A failed script stays
    /// recorded and is never retried automatically.
    #[default]
    RecordFirst,
    /// Record and execute inside one transaction; a failed script leaves no
    /// ledger row.
    Transactional,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::FirstFailure => write!(f, "first_failure"),
            FailurePolicy::CollectAll => write!(f, "collect_all"),
        }
    }
}

impl std::fmt::Display for LedgerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerMode::RecordFirst => write!(f, "record_first"),
            LedgerMode::Transactional => write!(f, "transactional"),
        }
    }
}

fn default_migrations_path() -> String {
    DEFAULT_MIGRATIONS_PATH.to_string()
}

fn default_ledger_table() -> String {
    DEFAULT_LEDGER_TABLE.to_string()
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            migrations_path: default_migrations_path(),
            ledger_table: default_ledger_table(),
            max_concurrency: default_max_concurrency(),
            failure_policy: FailurePolicy::default(),
            ledger_mode: LedgerMode::default(),
            database: DatabaseConfig::default(),
            targets: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    ///
    /// Looks for troop.yml or troop.yaml and falls back to the defaults when
    /// neither exists.
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("troop.yml");
        let yaml_path = dir.join("troop.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            log::debug!("No troop.yml in {}, using defaults", dir.display());
            Ok(Self::default())
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.ledger_table.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "ledger_table cannot be empty".to_string(),
            });
        }
        if self.migrations_path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migrations_path cannot be empty".to_string(),
            });
        }
        for (name, target) in &self.targets {
            if target
                .ledger_table
                .as_deref()
                .is_some_and(|t| t.trim().is_empty())
            {
                return Err(CoreError::ConfigInvalid {
                    message: format!("Target '{}' has an empty ledger_table", name),
                });
            }
        }
        Ok(())
    }

    /// Absolute migration directory for a project rooted at `root`
    pub fn migrations_path_absolute(&self, root: &Path) -> PathBuf {
        let path = Path::new(&self.migrations_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }

    /// Get target configuration by name
    pub fn get_target(&self, name: &str) -> CoreResult<&TargetConfig> {
        self.targets.get(name).ok_or_else(|| {
            let mut available: Vec<&str> = self.targets.keys().map(|k| k.as_str()).collect();
            available.sort_unstable();
            CoreError::ConfigInvalid {
                message: format!(
                    "Target '{}' not found. Available targets: {}",
                    name,
                    available.join(", ")
                ),
            }
        })
    }

    /// Get database configuration, optionally applying target overrides
    pub fn get_database_config(&self, target: Option<&str>) -> CoreResult<DatabaseConfig> {
        match target {
            Some(name) => Ok(self
                .get_target(name)?
                .database
                .clone()
                .unwrap_or_else(|| self.database.clone())),
            None => Ok(self.database.clone()),
        }
    }

    /// Get the ledger table name, optionally applying target overrides
    pub fn get_ledger_table(&self, target: Option<&str>) -> CoreResult<&str> {
        match target {
            Some(name) => Ok(self
                .get_target(name)?
                .ledger_table
                .as_deref()
                .unwrap_or(&self.ledger_table)),
            None => Ok(&self.ledger_table),
        }
    }

    /// Resolve target from CLI flag or TROOP_TARGET environment variable
    ///
    /// Priority: CLI flag > TROOP_TARGET env var > None
    pub fn resolve_target(cli_target: Option<&str>) -> Option<String> {
        cli_target
            .map(String::from)
            .or_else(|| std::env::var(TARGET_ENV_VAR).ok())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
