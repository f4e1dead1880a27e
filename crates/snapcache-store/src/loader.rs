//! Bulk loader
//!
//! Receives raw rows per table, converts them, and writes them in fixed-size
//! batches. Each table is loaded inside its own transaction:
//!
//! 1. first rows for a table: drop and recreate its destination table
//! 2. every full batch is written with a cached prepared statement
//! 3. when rows for another table arrive (or the load finishes): flush the
//!    partial batch, build indexes, commit
//!
//! A loader dropped mid-table rolls that table back. Tables the source never
//! mentioned are created empty by [`BulkLoader::finish`].

use crate::errors::{table_write, Result};
use crate::progress::Progress;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql, Transaction};
use snapcache_core::errors::{ImportError, ImportErrorKind};
use snapcache_core::{convert_row, log_op_end, log_op_error, log_op_start};
use snapcache_core::{CellValue, ConvertedRow, PlanRegistry, RawRow, TablePlan};
use std::collections::HashMap;
use std::time::Instant;

/// Rows written per batch
pub const BATCH_SIZE: usize = 500;

/// Accumulates converted rows into fixed-size batches
#[derive(Debug)]
pub struct RowBatcher {
    size: usize,
    rows: Vec<ConvertedRow>,
}

impl RowBatcher {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            rows: Vec::with_capacity(size),
        }
    }

    /// Add a row, returning a full batch once `size` rows are pending
    pub fn push(&mut self, row: ConvertedRow) -> Option<Vec<ConvertedRow>> {
        self.rows.push(row);
        if self.rows.len() >= self.size {
            Some(std::mem::replace(
                &mut self.rows,
                Vec::with_capacity(self.size),
            ))
        } else {
            None
        }
    }

    /// Pending rows, if any
    pub fn take_remaining(&mut self) -> Option<Vec<ConvertedRow>> {
        if self.rows.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.rows))
        }
    }

    pub fn pending(&self) -> usize {
        self.rows.len()
    }
}

/// Outcome of loading one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub table: String,
    pub rows: usize,
    pub batches: usize,
}

struct Cell<'a>(&'a CellValue);

impl ToSql for Cell<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            CellValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            CellValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
        })
    }
}

struct TableLoad<'c, 'p> {
    plan: &'p TablePlan,
    tx: Transaction<'c>,
    batcher: RowBatcher,
    rows: usize,
    batches: usize,
    started: Instant,
}

impl TableLoad<'_, '_> {
    fn write(&mut self, batch: &[ConvertedRow]) -> Result<()> {
        let table = self.plan.table();
        let mut stmt = self
            .tx
            .prepare_cached(self.plan.insert_sql())
            .map_err(|e| table_write(table, e))?;
        for row in batch {
            stmt.execute(params_from_iter(row.iter().map(Cell)))
                .map_err(|e| table_write(table, e))?;
        }
        self.rows += batch.len();
        self.batches += 1;
        Ok(())
    }

    fn flush_and_index(&mut self) -> Result<()> {
        if let Some(batch) = self.batcher.take_remaining() {
            self.write(&batch)?;
        }
        for sql in self.plan.index_sql() {
            self.tx
                .execute(sql, [])
                .map_err(|e| table_write(self.plan.table(), e))?;
        }
        Ok(())
    }

    fn commit(mut self) -> Result<LoadReport> {
        if let Err(e) = self.flush_and_index() {
            return Err(self.fail(e));
        }
        let report = LoadReport {
            table: self.plan.table().to_string(),
            rows: self.rows,
            batches: self.batches,
        };
        let duration_ms = self.started.elapsed().as_millis() as u64;
        match self.tx.commit() {
            Ok(()) => {
                log_op_end!(
                    "load_table",
                    duration_ms = duration_ms,
                    table = report.table.as_str(),
                    rows = report.rows,
                    batches = report.batches,
                );
                Ok(report)
            }
            Err(e) => {
                let err = table_write(&report.table, e);
                log_op_error!(
                    "load_table",
                    &err,
                    duration_ms = duration_ms,
                    table = report.table.as_str(),
                );
                Err(err)
            }
        }
    }

    fn fail(&self, err: ImportError) -> ImportError {
        log_op_error!(
            "load_table",
            &err,
            duration_ms = self.started.elapsed().as_millis() as u64,
            table = self.plan.table(),
            rows = self.rows,
        );
        err
    }
}

/// Writes converted rows into the snapshot store
pub struct BulkLoader<'c, 'p> {
    conn: &'c Connection,
    plans: &'p PlanRegistry,
    batch_size: usize,
    active: Option<TableLoad<'c, 'p>>,
    reports: HashMap<String, LoadReport>,
}

impl<'c, 'p> BulkLoader<'c, 'p> {
    pub fn new(conn: &'c Connection, plans: &'p PlanRegistry) -> Self {
        Self {
            conn,
            plans,
            batch_size: BATCH_SIZE,
            active: None,
            reports: HashMap::new(),
        }
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Load one run of raw rows for `plan`'s table
    ///
    /// # Errors
    ///
    /// Returns a Persistence error naming the table if a write fails. The
    /// table's transaction is rolled back when the loader is dropped.
    pub fn load(
        &mut self,
        plan: &TablePlan,
        rows: Vec<RawRow>,
        progress: &mut Progress<'_>,
    ) -> Result<()> {
        let plans = self.plans;
        let plan = plans.get(plan.table()).ok_or_else(|| {
            ImportError::new(ImportErrorKind::Internal)
                .with_op("load_table")
                .with_table(plan.table())
                .with_message("table is not part of the plan registry")
        })?;

        if self.active.as_ref().map(|a| a.plan.table()) != Some(plan.table()) {
            self.finish_active(progress)?;
            self.begin(plan, progress)?;
        }
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };

        for raw in rows {
            let converted = convert_row(active.plan, &raw);
            if let Some(batch) = active.batcher.push(converted) {
                if let Err(e) = active.write(&batch) {
                    return Err(active.fail(e));
                }
                progress.report(&format!(
                    "{}: {} rows processed...",
                    active.plan.table(),
                    active.rows
                ));
            }
        }
        Ok(())
    }

    /// Commit the table in progress and create every table not yet seen
    ///
    /// # Errors
    ///
    /// Returns a Persistence error if a write, index build or commit fails.
    pub fn finish(mut self, progress: &mut Progress<'_>) -> Result<Vec<LoadReport>> {
        self.finish_active(progress)?;
        let plans = self.plans;
        for plan in plans {
            if !self.reports.contains_key(plan.table()) {
                self.begin(plan, progress)?;
                self.finish_active(progress)?;
            }
        }

        let mut reports: Vec<LoadReport> = self.reports.into_values().collect();
        reports.sort_by_key(|r| plans.position(&r.table));
        Ok(reports)
    }

    fn begin(&mut self, plan: &'p TablePlan, progress: &mut Progress<'_>) -> Result<()> {
        let table = plan.table();
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| table_write(table, e))?;

        let (rows, batches) = match self.reports.remove(table) {
            Some(previous) => {
                tracing::warn!(
                    table,
                    rows = previous.rows,
                    "rows for table resumed after another table; appending"
                );
                (previous.rows, previous.batches)
            }
            None => {
                progress.report(&format!("Importing {} ...", table));
                tx.execute(&plan.drop_sql(), [])
                    .map_err(|e| table_write(table, e))?;
                tx.execute(plan.create_sql(), [])
                    .map_err(|e| table_write(table, e))?;
                (0, 0)
            }
        };
        log_op_start!("load_table", table = table);

        self.active = Some(TableLoad {
            plan,
            tx,
            batcher: RowBatcher::new(self.batch_size),
            rows,
            batches,
            started: Instant::now(),
        });
        Ok(())
    }

    fn finish_active(&mut self, progress: &mut Progress<'_>) -> Result<()> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };
        let report = active.commit()?;
        progress.report(&format!("{}: {} rows imported.", report.table, report.rows));
        self.reports.insert(report.table.clone(), report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn raw(values: &[&str]) -> RawRow {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    fn payment_rows(n: usize) -> Vec<RawRow> {
        (0..n)
            .map(|i| raw(&[&format!("P{i:05}"), "Cash"]))
            .collect()
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .unwrap()
    }

    #[test]
    fn test_batcher_flush_sizes() {
        let mut batcher = RowBatcher::new(500);
        let mut flushed = Vec::new();
        for _ in 0..1001 {
            if let Some(batch) = batcher.push(vec![CellValue::Integer(1)]) {
                flushed.push(batch.len());
            }
        }
        if let Some(batch) = batcher.take_remaining() {
            flushed.push(batch.len());
        }

        assert_eq!(flushed, vec![500, 500, 1]);
        assert_eq!(batcher.pending(), 0);
        assert!(batcher.take_remaining().is_none());
    }

    #[test]
    fn test_load_reports_batches_and_progress() {
        let conn = db::open_in_memory().unwrap();
        let plans = PlanRegistry::clinic().unwrap();
        let plan = plans.get("payment_method").unwrap();
        let mut messages = Vec::new();
        let mut sink = |m: &str| messages.push(m.to_string());
        let mut progress = Progress::new(&mut sink);

        let mut loader = BulkLoader::new(&conn, &plans);
        loader.load(plan, payment_rows(700), &mut progress).unwrap();
        loader.load(plan, payment_rows(1001).split_off(700), &mut progress).unwrap();
        let reports = loader.finish(&mut progress).unwrap();
        drop(progress);

        let payment = reports.iter().find(|r| r.table == "payment_method").unwrap();
        assert_eq!(payment.rows, 1001);
        assert_eq!(payment.batches, 3);
        assert_eq!(count(&conn, "payment_method"), 1001);
        assert_eq!(reports.len(), plans.len());

        let processed: Vec<_> = messages
            .iter()
            .filter(|m| m.starts_with("payment_method:") && m.ends_with("processed..."))
            .collect();
        assert_eq!(processed.len(), 2);
        assert!(messages.contains(&"payment_method: 1001 rows imported.".to_string()));
        assert_eq!(messages[0], "Importing payment_method ...");
    }

    #[test]
    fn test_finish_creates_unseen_tables_with_indexes() {
        let conn = db::open_in_memory().unwrap();
        let plans = PlanRegistry::clinic().unwrap();
        let mut sink = |_: &str| {};
        let mut progress = Progress::new(&mut sink);

        let reports = BulkLoader::new(&conn, &plans)
            .finish(&mut progress)
            .unwrap();

        assert!(reports.iter().all(|r| r.rows == 0));
        assert_eq!(count(&conn, "patients"), 0);
        let index: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_stock_items_name'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_dropped_loader_rolls_back_active_table() {
        let conn = db::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE payment_method (paycode TEXT PRIMARY KEY, description TEXT NOT NULL);
             INSERT INTO payment_method VALUES ('OLD', 'Previous');",
        )
        .unwrap();
        let plans = PlanRegistry::clinic().unwrap();
        let plan = plans.get("payment_method").unwrap();
        let mut sink = |_: &str| {};
        let mut progress = Progress::new(&mut sink);

        let mut loader = BulkLoader::new(&conn, &plans).with_batch_size(2);
        loader.load(plan, payment_rows(5), &mut progress).unwrap();
        drop(loader);

        let paycode: String = conn
            .query_row("SELECT paycode FROM payment_method", [], |row| row.get(0))
            .unwrap();
        assert_eq!(paycode, "OLD");
    }

    #[test]
    fn test_resumed_table_appends() {
        let conn = db::open_in_memory().unwrap();
        let plans = PlanRegistry::clinic().unwrap();
        let payment = plans.get("payment_method").unwrap();
        let stock = plans.get("stock_items").unwrap();
        let mut sink = |_: &str| {};
        let mut progress = Progress::new(&mut sink);

        let mut loader = BulkLoader::new(&conn, &plans);
        loader.load(payment, payment_rows(3), &mut progress).unwrap();
        loader.load(stock, vec![raw(&["S1", "Item"])], &mut progress).unwrap();
        loader
            .load(payment, vec![raw(&["EXTRA", "Card"])], &mut progress)
            .unwrap();
        let reports = loader.finish(&mut progress).unwrap();

        assert_eq!(count(&conn, "payment_method"), 4);
        assert_eq!(count(&conn, "stock_items"), 1);
        let payment_report = reports.iter().find(|r| r.table == "payment_method").unwrap();
        assert_eq!(payment_report.rows, 4);
    }
}
