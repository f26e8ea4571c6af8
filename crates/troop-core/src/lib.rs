//! troop-core - Core library for Troop
//!
//! This crate provides the project configuration, the migration unit types,
//! migration directory discovery, and SQL quoting helpers shared by the
//! other Troop crates.

pub mod config;
pub mod discovery;
pub mod error;
pub mod migration;
mod newtype_string;
pub mod sql_utils;

pub use config::{Config, DatabaseConfig, DbType, FailurePolicy, LedgerMode, TargetConfig};
pub use discovery::discover_migrations;
pub use error::{CoreError, CoreResult};
pub use migration::{MigrationId, MigrationUnit};
