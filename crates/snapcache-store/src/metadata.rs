//! Cache metadata store
//!
//! A key/value table inside the snapshot store. The key that matters is
//! `source_signature`: it identifies the source state the current snapshot
//! was built from.

use crate::errors::{from_rusqlite, Result};
use rusqlite::{Connection, OptionalExtension};

pub const SIGNATURE_KEY: &str = "source_signature";
/// Written by older releases that only supported dump imports
pub const LEGACY_SIGNATURE_KEY: &str = "backup_sha256";
pub const SOURCE_MODE_KEY: &str = "source_mode";
pub const REBUILT_AT_KEY: &str = "rebuilt_at";
pub const RUN_ID_KEY: &str = "run_id";

/// Create the metadata table if it does not exist
pub fn ensure_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
        [],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
        row.get(0)
    })
    .optional()
    .map_err(from_rusqlite)
}

pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        [key, value],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

/// Signature of the source the snapshot was built from
///
/// Falls back to the legacy key. Errors if the metadata table is missing.
pub fn read_signature(conn: &Connection) -> Result<Option<String>> {
    match get(conn, SIGNATURE_KEY)? {
        Some(signature) => Ok(Some(signature)),
        None => get(conn, LEGACY_SIGNATURE_KEY),
    }
}

/// Forget the recorded signature under both keys
///
/// Called before a rebuild touches any table, so a rebuild that fails part
/// way never leaves a snapshot that still claims to match its old source.
pub fn clear_signature(conn: &Connection) -> Result<()> {
    conn.execute(
        "DELETE FROM metadata WHERE key IN (?1, ?2)",
        [SIGNATURE_KEY, LEGACY_SIGNATURE_KEY],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

/// Record a completed rebuild in one transaction
pub fn record_rebuild(
    conn: &Connection,
    signature: &str,
    source_mode: &str,
    run_id: &str,
) -> Result<()> {
    let tx = conn.unchecked_transaction().map_err(from_rusqlite)?;
    ensure_table(&tx)?;
    set(&tx, SIGNATURE_KEY, signature)?;
    set(&tx, SOURCE_MODE_KEY, source_mode)?;
    set(&tx, REBUILT_AT_KEY, &chrono::Utc::now().to_rfc3339())?;
    set(&tx, RUN_ID_KEY, run_id)?;
    tx.commit().map_err(from_rusqlite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_read_signature_missing_table_is_error() {
        let conn = db::open_in_memory().unwrap();
        assert!(read_signature(&conn).is_err());
    }

    #[test]
    fn test_record_rebuild_then_read() {
        let conn = db::open_in_memory().unwrap();
        record_rebuild(&conn, "abc123", "dump", "run-1").unwrap();

        assert_eq!(read_signature(&conn).unwrap().as_deref(), Some("abc123"));
        assert_eq!(get(&conn, SOURCE_MODE_KEY).unwrap().as_deref(), Some("dump"));
        assert!(get(&conn, REBUILT_AT_KEY).unwrap().is_some());
    }

    #[test]
    fn test_legacy_key_fallback() {
        let conn = db::open_in_memory().unwrap();
        ensure_table(&conn).unwrap();
        set(&conn, LEGACY_SIGNATURE_KEY, "legacy").unwrap();

        assert_eq!(read_signature(&conn).unwrap().as_deref(), Some("legacy"));

        set(&conn, SIGNATURE_KEY, "current").unwrap();
        assert_eq!(read_signature(&conn).unwrap().as_deref(), Some("current"));
    }

    #[test]
    fn test_clear_signature_removes_both_keys() {
        let conn = db::open_in_memory().unwrap();
        record_rebuild(&conn, "abc123", "backup", "run-1").unwrap();
        set(&conn, LEGACY_SIGNATURE_KEY, "legacy").unwrap();

        clear_signature(&conn).unwrap();

        assert_eq!(read_signature(&conn).unwrap(), None);
        assert_eq!(get(&conn, SOURCE_MODE_KEY).unwrap().as_deref(), Some("backup"));
    }

    #[test]
    fn test_set_overwrites() {
        let conn = db::open_in_memory().unwrap();
        ensure_table(&conn).unwrap();
        set(&conn, "k", "1").unwrap();
        set(&conn, "k", "2").unwrap();
        assert_eq!(get(&conn, "k").unwrap().as_deref(), Some("2"));
    }
}
