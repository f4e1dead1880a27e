//! Dump file row source

use super::{RowSink, RowSource};
use crate::errors::{dump_unavailable, Result};
use snapcache_core::dump::{parse_insert, StatementScanner};
use snapcache_core::{DecodePolicy, ImportError, PlanRegistry};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Reads rows from a text dump in a single pass
pub struct DumpSource {
    path: PathBuf,
    policy: DecodePolicy,
}

impl DumpSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            policy: DecodePolicy::default(),
        }
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSource for DumpSource {
    fn stream(&mut self, plans: &PlanRegistry, sink: &mut RowSink<'_>) -> Result<()> {
        let file = File::open(&self.path).map_err(|e| dump_unavailable(&self.path, &e))?;
        let scanner = StatementScanner::new(BufReader::new(file))
            .with_tables(plans.table_names())
            .with_decode_policy(self.policy);

        for statement in scanner {
            let statement = statement.map_err(|e| dump_unavailable(&self.path, &e))?;
            let Some(plan) = plans.get(&statement.table) else {
                continue;
            };
            let parsed = parse_insert(&statement.text)
                .map_err(|e| ImportError::from(e).with_table(plan.table()))?;
            tracing::trace!(
                table = plan.table(),
                line = statement.line,
                rows = parsed.rows.len(),
                "parsed statement"
            );
            sink(plan, parsed.rows)?;
        }
        Ok(())
    }
}
