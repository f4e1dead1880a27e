//! Cache commands
//!
//! Usage:
//!   snapcache cache ensure [--force] [--settings PATH]
//!   snapcache cache status [--settings PATH]

use clap::{Args, Subcommand};
use snapcache_core::PlanRegistry;
use snapcache_store::status::read_status;
use snapcache_store::{CacheImporter, CacheSettings};
use std::path::PathBuf;

const DEFAULT_SETTINGS: &str = "settings.toml";

#[derive(Debug, Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Rebuild the snapshot cache if the source changed
    Ensure(EnsureArgs),
    /// Show what the snapshot cache holds
    Status(StatusArgs),
}

#[derive(Debug, Args)]
pub struct EnsureArgs {
    /// Rebuild even if the source signature is unchanged
    #[arg(long)]
    pub force: bool,

    /// Settings file
    #[arg(long, default_value = DEFAULT_SETTINGS)]
    pub settings: PathBuf,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Settings file
    #[arg(long, default_value = DEFAULT_SETTINGS)]
    pub settings: PathBuf,
}

/// Execute cache command
pub fn execute(args: CacheArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        CacheCommand::Ensure(ensure_args) => execute_ensure(ensure_args),
        CacheCommand::Status(status_args) => execute_status(status_args),
    }
}

fn execute_ensure(args: EnsureArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = CacheSettings::load(&args.settings)?;
    let importer = CacheImporter::new(
        settings.resolve_cache_path(),
        settings.data_source()?,
        PlanRegistry::clinic()?,
    )?;
    tracing::debug!(cache = %importer.cache_path().display(), "ensuring cache");

    importer.ensure_cache(args.force, |msg| println!("{}", msg))?;
    Ok(())
}

fn execute_status(args: StatusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = CacheSettings::load(&args.settings)?;
    let status = read_status(&settings.resolve_cache_path(), &PlanRegistry::clinic()?)?;

    println!("Cache: {}", status.cache_path.display());
    if !status.exists {
        println!("Not built yet.");
        return Ok(());
    }
    let or_unknown = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    println!("Signature: {}", or_unknown(&status.signature));
    println!("Source: {}", or_unknown(&status.source_mode));
    println!("Rebuilt at: {}", or_unknown(&status.rebuilt_at));
    for table in &status.tables {
        match table.rows {
            Some(rows) => println!("  {}: {} rows", table.table, rows),
            None => println!("  {}: missing", table.table),
        }
    }
    Ok(())
}
