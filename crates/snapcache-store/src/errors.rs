//! Error helpers for snapcache-store
//!
//! Wraps the core ImportError with store-specific constructors

use snapcache_core::errors::{ImportError, ImportErrorKind};
use std::path::Path;

/// Result type alias using ImportError
pub type Result<T> = std::result::Result<T, ImportError>;

/// Create a configuration error
pub fn configuration(reason: impl Into<String>) -> ImportError {
    ImportError::new(ImportErrorKind::Configuration)
        .with_op("configure_source")
        .with_message(reason)
}

/// Create a source-unavailable error for a dump file
pub fn dump_unavailable(path: &Path, err: &std::io::Error) -> ImportError {
    ImportError::new(ImportErrorKind::SourceUnavailable)
        .with_op("open_dump")
        .with_message(format!("Backup file not readable: {}: {}", path.display(), err))
}

/// Create a source-unavailable error for a dump path that does not exist
pub fn dump_missing(path: &Path) -> ImportError {
    ImportError::new(ImportErrorKind::SourceUnavailable)
        .with_op("open_dump")
        .with_message(format!("Backup file not found: {}", path.display()))
}

/// Create a source-unavailable error for the live source
pub fn live_unavailable(descriptor: &str, err: impl std::fmt::Display) -> ImportError {
    ImportError::new(ImportErrorKind::SourceUnavailable)
        .with_op("connect_live")
        .with_message(format!("Unable to connect to MySQL at {}: {}", descriptor, err))
}

/// Create a connectivity error for a failed live read
pub fn connectivity(table: &str, err: impl std::fmt::Display) -> ImportError {
    ImportError::new(ImportErrorKind::Connectivity)
        .with_op("read_live_rows")
        .with_table(table)
        .with_message(err.to_string())
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ImportError {
    ImportError::new(ImportErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create a database error with table context
pub fn table_write(table: &str, err: rusqlite::Error) -> ImportError {
    from_rusqlite(err).with_op("load_table").with_table(table)
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ImportError {
    ImportError::new(ImportErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
