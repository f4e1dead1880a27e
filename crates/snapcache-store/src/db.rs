//! Snapshot store connection management

use crate::errors::{from_rusqlite, io_error, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (creating if needed) the snapshot store for a rebuild
///
/// Creates the parent directory on demand.
pub fn open_for_rebuild(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error("create_cache_dir", e))?;
    }
    let conn = Connection::open(path).map_err(from_rusqlite)?;
    configure_for_rebuild(&conn)?;
    Ok(conn)
}

/// Open an existing snapshot store; never creates one
pub fn open_existing(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(from_rusqlite)?;
    conn.busy_timeout(BUSY_TIMEOUT).map_err(from_rusqlite)?;
    Ok(conn)
}

/// Open an in-memory store (for testing)
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().map_err(from_rusqlite)?;
    configure_for_rebuild(&conn)?;
    Ok(conn)
}

/// Bulk-load settings: WAL so readers keep seeing the previous table while
/// one is rebuilt, no fsync per commit, temp structures in memory
pub fn configure_for_rebuild(conn: &Connection) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT).map_err(from_rusqlite)?;
    let _mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(from_rusqlite)?;
    conn.pragma_update(None, "synchronous", "OFF")
        .map_err(from_rusqlite)?;
    conn.pragma_update(None, "temp_store", "MEMORY")
        .map_err(from_rusqlite)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_for_rebuild_creates_parent_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.sqlite");

        let conn = open_for_rebuild(&path).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();

        assert!(path.exists());
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_open_existing_does_not_create() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.sqlite");

        assert!(open_existing(&path).is_err());
        assert!(!path.exists());
    }
}
