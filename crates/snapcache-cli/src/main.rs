//! SnapCache CLI
//!
//! Command-line interface for the clinic snapshot cache

use clap::{Parser, Subcommand};
use snapcache_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "snapcache")]
#[command(about = "SnapCache - local SQLite snapshots of the clinic database", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Snapshot cache operations
    Cache(commands::cache::CacheArgs),
}

fn main() {
    let cli = Cli::parse();
    init(if cli.json_logs {
        Profile::Production
    } else {
        Profile::Development
    });

    let result = match cli.command {
        Commands::Cache(args) => commands::cache::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
