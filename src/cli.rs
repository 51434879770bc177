use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::engine::SchedulingPolicy;

/// Windows Turbo Optimizer - batch system maintenance
#[derive(Parser, Debug)]
#[command(name = "turbo-optimizer")]
#[command(about = "Runs a selection of Windows maintenance tasks and reports each outcome")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: show what would be executed without making changes.
    ///
    /// State-changing commands (DISM, defrag, netsh, sc) are skipped and
    /// logged, and purges only count what they would delete. Read-only
    /// queries (disk media type, sfc /verifyonly) still execute so the
    /// preview is realistic.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Print the final report as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the task catalog
    List,
    /// Run a selection of tasks (catalog defaults when none is given)
    Run(RunArgs),
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
    /// Write a configuration file with the catalog defaults
    InitConfig {
        /// Destination path
        path: PathBuf,
    },
}

#[derive(clap::Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Comma-separated task indices, in execution order (e.g. 0,2,5)
    #[arg(short, long, value_delimiter = ',', conflicts_with = "all")]
    pub tasks: Option<Vec<usize>>,

    /// Run every task in the catalog
    #[arg(long)]
    pub all: bool,

    /// Path to configuration file to use
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Scheduling policy (sequential or affinity)
    #[arg(long)]
    pub policy: Option<SchedulingPolicy>,

    /// Maximum concurrently running tasks under the affinity policy
    #[arg(long)]
    pub max_workers: Option<usize>,
}
