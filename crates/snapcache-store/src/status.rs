//! Snapshot store status

use crate::db;
use crate::errors::Result;
use crate::metadata;
use snapcache_core::PlanRegistry;
use std::path::{Path, PathBuf};

/// Row count of one registered table; `None` if the table is missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCount {
    pub table: String,
    pub rows: Option<u64>,
}

/// What the snapshot store currently holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub cache_path: PathBuf,
    pub exists: bool,
    pub signature: Option<String>,
    pub source_mode: Option<String>,
    pub rebuilt_at: Option<String>,
    pub run_id: Option<String>,
    pub tables: Vec<TableCount>,
}

/// Read the status of the store at `cache_path` without modifying it
///
/// # Errors
///
/// Returns a Persistence error if an existing store cannot be opened.
pub fn read_status(cache_path: &Path, plans: &PlanRegistry) -> Result<CacheStatus> {
    let mut status = CacheStatus {
        cache_path: cache_path.to_path_buf(),
        exists: cache_path.is_file(),
        signature: None,
        source_mode: None,
        rebuilt_at: None,
        run_id: None,
        tables: Vec::new(),
    };
    if !status.exists {
        return Ok(status);
    }

    let conn = db::open_existing(cache_path)?;
    let lookup = |key: &str| metadata::get(&conn, key).ok().flatten();
    status.signature = metadata::read_signature(&conn).ok().flatten();
    status.source_mode = lookup(metadata::SOURCE_MODE_KEY);
    status.rebuilt_at = lookup(metadata::REBUILT_AT_KEY);
    status.run_id = lookup(metadata::RUN_ID_KEY);
    status.tables = plans
        .iter()
        .map(|plan| TableCount {
            table: plan.table().to_string(),
            rows: conn
                .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", plan.table()), [], |row| {
                    row.get::<_, i64>(0)
                })
                .ok()
                .map(|n| n.max(0) as u64),
        })
        .collect();
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_store() {
        let dir = TempDir::new().unwrap();
        let status = read_status(&dir.path().join("none.sqlite"), &PlanRegistry::clinic().unwrap()).unwrap();

        assert!(!status.exists);
        assert!(status.signature.is_none());
        assert!(status.tables.is_empty());
    }

    #[test]
    fn test_partial_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.sqlite");
        let conn = db::open_for_rebuild(&path).unwrap();
        conn.execute_batch("CREATE TABLE payment_method (paycode TEXT, description TEXT)")
            .unwrap();
        metadata::record_rebuild(&conn, "sig", "backup", "run").unwrap();
        drop(conn);

        let status = read_status(&path, &PlanRegistry::clinic().unwrap()).unwrap();

        assert_eq!(status.signature.as_deref(), Some("sig"));
        assert_eq!(status.source_mode.as_deref(), Some("backup"));
        let payment = status.tables.iter().find(|t| t.table == "payment_method").unwrap();
        assert_eq!(payment.rows, Some(0));
        let patients = status.tables.iter().find(|t| t.table == "patients").unwrap();
        assert_eq!(patients.rows, None);
    }
}
