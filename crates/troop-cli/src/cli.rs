//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// Troop - apply pending SQL migrations concurrently, exactly once
#[derive(Parser, Debug)]
#[command(name = "troop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override target (database connection)
    #[arg(short, long, global = true)]
    pub target: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply every pending migration
    Migrate(MigrateArgs),

    /// Show which migrations are applied and which are pending
    Status(StatusArgs),
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Path to the migration scripts (default: migrations_path from troop.yml)
    #[arg(long)]
    pub path: Option<String>,

    /// Maximum number of migrations executing at once (0 = unbounded)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Wait for every migration and report all failures
    #[arg(long)]
    pub collect_failures: bool,

    /// Record and execute each migration in a single transaction
    #[arg(long)]
    pub transactional: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Path to the migration scripts (default: migrations_path from troop.yml)
    #[arg(long)]
    pub path: Option<String>,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
