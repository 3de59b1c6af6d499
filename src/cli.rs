//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docdaemon - documentation generation for discovered code entry points
#[derive(Parser)]
#[command(
    name = "docd",
    about = "Rate- and concurrency-limited documentation generation daemon",
    version,
    after_help = "Logs are written to: ~/.local/share/docdaemon/logs/docdaemon.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Generate docs for the entry points listed in a manifest file
    Run {
        /// JSON file with an array of entry points
        /// (class_fqn, method, file, line, annotation)
        entries: PathBuf,

        /// Generate one document per class instead of per method
        #[arg(long)]
        class_scope: bool,
    },

    /// Re-admit unfinished tasks from the task history and run them
    Resume,

    /// Show task history counts by status
    Status,
}
