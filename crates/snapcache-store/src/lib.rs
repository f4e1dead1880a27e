//! SnapCache Store - SQLite snapshot store and import pipeline
//!
//! Provides:
//! - Snapshot store connections and cache metadata
//! - Source signatures for skip-on-unchanged rebuilds
//! - Row sources for text dumps and live MySQL
//! - Batched bulk loading and the `CacheImporter` orchestrator
//! - TOML cache settings

pub mod config;
pub mod db;
pub mod errors;
pub mod importer;
pub mod loader;
pub mod metadata;
pub mod progress;
pub mod signature;
pub mod source;
pub mod status;

// Re-export key types
pub use config::CacheSettings;
pub use errors::Result;
pub use importer::CacheImporter;
pub use loader::{LoadReport, BATCH_SIZE};
pub use source::{DataSource, LiveSettings, SourceMode};
pub use status::{CacheStatus, TableCount};
