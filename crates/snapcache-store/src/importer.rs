//! Cache import orchestration
//!
//! `CacheImporter::ensure_cache` is the entry point collaborators call. It
//! decides whether the snapshot store is current and, if not, drives a
//! row source through the bulk loader and records the new signature.

use crate::db;
use crate::errors::{dump_missing, Result};
use crate::loader::{BulkLoader, LoadReport, BATCH_SIZE};
use crate::metadata;
use crate::progress::Progress;
use crate::signature::compute_signature;
use crate::source::{DataSource, DumpSource, LiveSource, RowSource, SourceMode};
use crate::status::{read_status, CacheStatus};
use snapcache_core::{log_op_end, log_op_error, log_op_start};
use snapcache_core::{DecodePolicy, PlanRegistry};
use snapcache_core_types::RunId;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const MSG_UP_TO_DATE: &str = "SQLite cache already up to date.";
pub const MSG_REBUILDING: &str = "Rebuilding SQLite cache ...";
pub const MSG_COMPLETE: &str = "SQLite cache rebuild complete.";

/// Keeps a SQLite snapshot store in step with a data source
#[derive(Debug)]
pub struct CacheImporter {
    cache_path: PathBuf,
    source: DataSource,
    plans: PlanRegistry,
    decode_policy: DecodePolicy,
    batch_size: usize,
}

impl CacheImporter {
    /// Create an importer
    ///
    /// # Errors
    ///
    /// Returns a SourceUnavailable error if a dump source does not exist.
    pub fn new(
        cache_path: impl Into<PathBuf>,
        source: DataSource,
        plans: PlanRegistry,
    ) -> Result<Self> {
        if let DataSource::Dump(path) = &source {
            if !path.exists() {
                return Err(dump_missing(path));
            }
        }
        Ok(Self {
            cache_path: cache_path.into(),
            source,
            plans,
            decode_policy: DecodePolicy::default(),
            batch_size: BATCH_SIZE,
        })
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub fn plans(&self) -> &PlanRegistry {
        &self.plans
    }

    /// Bring the snapshot store up to date with the source
    ///
    /// A dump source whose signature matches the stored one is skipped
    /// unless `force` is set. Live sources are always rebuilt.
    ///
    /// # Errors
    ///
    /// Returns the first source, format, connectivity or persistence
    /// failure. Tables committed before the failure keep their new
    /// contents. The stored signature is cleared before the first table is
    /// written and only recorded again after every table succeeds.
    pub fn ensure_cache(&self, force: bool, mut on_progress: impl FnMut(&str)) -> Result<()> {
        let run_id = RunId::new();
        let mode = self.source.mode();
        let start = Instant::now();
        log_op_start!(
            "ensure_cache",
            run_id = %run_id,
            source_mode = mode.as_str(),
            force = force,
        );

        let mut progress = Progress::new(&mut on_progress);
        let result = self.ensure(force, &run_id, &mut progress);

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(Some(reports)) => log_op_end!(
                "ensure_cache",
                duration_ms = duration_ms,
                run_id = %run_id,
                rebuilt = true,
                rows = reports.iter().map(|r| r.rows).sum::<usize>(),
            ),
            Ok(None) => log_op_end!(
                "ensure_cache",
                duration_ms = duration_ms,
                run_id = %run_id,
                rebuilt = false,
            ),
            Err(e) => log_op_error!(
                "ensure_cache",
                e,
                duration_ms = duration_ms,
                run_id = %run_id,
                table = e.table().unwrap_or(""),
            ),
        }
        result.map(|_| ())
    }

    /// Status of the snapshot store this importer writes
    ///
    /// # Errors
    ///
    /// Returns a Persistence error if the store exists but cannot be opened.
    pub fn status(&self) -> Result<CacheStatus> {
        read_status(&self.cache_path, &self.plans)
    }

    fn ensure(
        &self,
        force: bool,
        run_id: &RunId,
        progress: &mut Progress<'_>,
    ) -> Result<Option<Vec<LoadReport>>> {
        let signature = compute_signature(&self.source)?;

        if self.source.mode() == SourceMode::Dump && !force && self.is_current(&signature) {
            progress.report(MSG_UP_TO_DATE);
            return Ok(None);
        }

        progress.report(MSG_REBUILDING);
        let reports = match &self.source {
            DataSource::Dump(path) => {
                let mut source = DumpSource::new(path).with_decode_policy(self.decode_policy);
                self.rebuild(&mut source, &signature, run_id, progress)?
            }
            DataSource::Live(settings) => {
                let mut source = LiveSource::connect(settings)?.with_decode_policy(self.decode_policy);
                let result = self.rebuild(&mut source, &signature, run_id, progress);
                source.close();
                result?
            }
        };
        progress.report(MSG_COMPLETE);
        Ok(Some(reports))
    }

    fn is_current(&self, signature: &str) -> bool {
        if !self.cache_path.exists() {
            return false;
        }
        let stored = db::open_existing(&self.cache_path)
            .and_then(|conn| metadata::read_signature(&conn));
        match stored {
            Ok(Some(stored)) => stored == signature,
            Ok(None) => false,
            Err(e) => {
                tracing::debug!(error = %e, "stored signature unreadable; rebuilding");
                false
            }
        }
    }

    fn rebuild(
        &self,
        source: &mut dyn RowSource,
        signature: &str,
        run_id: &RunId,
        progress: &mut Progress<'_>,
    ) -> Result<Vec<LoadReport>> {
        let conn = db::open_for_rebuild(&self.cache_path)?;
        metadata::ensure_table(&conn)?;
        metadata::clear_signature(&conn)?;

        let mut loader = BulkLoader::new(&conn, &self.plans).with_batch_size(self.batch_size);
        source.stream(&self.plans, &mut |plan, rows| {
            loader.load(plan, rows, progress)
        })?;
        let reports = loader.finish(progress)?;

        metadata::record_rebuild(
            &conn,
            signature,
            self.source.mode().as_str(),
            run_id.as_str(),
        )?;
        Ok(reports)
    }
}
