//! Live MySQL row source
//!
//! The MySQL driver is async; the importer is not. A `LiveSource` owns a
//! current-thread tokio runtime and blocks on it for every driver call, so
//! callers see a plain synchronous source.
//!
//! Queries are sent without bind arguments, which keeps them on the text
//! protocol: every non-null cell arrives as the server's textual rendering
//! and is decoded to a raw token under the source's [`DecodePolicy`].

use super::{LiveSettings, RowSink, RowSource};
use crate::errors::{connectivity, io_error, live_unavailable, Result};
use futures::TryStreamExt;
use snapcache_core::{log_op_end, log_op_error, log_op_start};
use snapcache_core::{DecodePolicy, PlanRegistry, RawRow, TablePlan};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlRow};
use sqlx::{ConnectOptions, Connection, Executor, Row};
use std::time::Instant;
use tokio::runtime::Runtime;

/// Rows fetched per page
pub const PAGE_SIZE: usize = 500;

const ER_UNKNOWN_CHARACTER_SET: u16 = 1115;

/// An open connection to the live source
pub struct LiveSource {
    runtime: Runtime,
    conn: MySqlConnection,
    descriptor: String,
    policy: DecodePolicy,
}

impl LiveSource {
    /// Connect, negotiating `utf8mb4` and falling back to `utf8` once
    ///
    /// # Errors
    ///
    /// Returns a SourceUnavailable error if the server cannot be reached or
    /// rejects the connection.
    pub fn connect(settings: &LiveSettings) -> Result<Self> {
        let descriptor = settings.descriptor();
        let start = Instant::now();
        log_op_start!("connect_live", source = %descriptor);

        let result = Self::open(settings, &descriptor);
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => log_op_end!("connect_live", duration_ms = duration_ms),
            Err(e) => log_op_error!("connect_live", e, duration_ms = duration_ms),
        }
        result
    }

    fn open(settings: &LiveSettings, descriptor: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| io_error("start_live_runtime", e))?;

        let preferred = connect_options(settings).charset("utf8mb4");
        let conn = match runtime.block_on(preferred.connect()) {
            Ok(conn) => conn,
            Err(err) if is_unknown_charset(&err) => {
                tracing::warn!(
                    source = %descriptor,
                    "server does not support utf8mb4; retrying with utf8"
                );
                let fallback = connect_options(settings)
                    .charset("utf8")
                    .collation("utf8_general_ci");
                runtime.block_on(fallback.connect()).map_err(|e| {
                    live_unavailable(
                        descriptor,
                        format!("utf8mb4 unsupported and utf8 fallback failed: {}", e),
                    )
                })?
            }
            Err(err) => return Err(live_unavailable(descriptor, err)),
        };

        Ok(Self {
            runtime,
            conn,
            descriptor: descriptor.to_string(),
            policy: DecodePolicy::default(),
        })
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Close the connection; failures are logged, not returned
    pub fn close(self) {
        let Self {
            runtime,
            conn,
            descriptor,
            ..
        } = self;
        if let Err(e) = runtime.block_on(conn.close()) {
            tracing::warn!(source = %descriptor, error = %e, "closing MySQL connection failed");
        }
    }
}

impl RowSource for LiveSource {
    fn stream(&mut self, plans: &PlanRegistry, sink: &mut RowSink<'_>) -> Result<()> {
        let runtime = &self.runtime;
        let conn = &mut self.conn;
        let policy = self.policy;

        for plan in plans {
            let sql = plan.select_sql();
            tracing::debug!(table = plan.table(), sql = %sql, "reading live table");

            let mut fetched = (&mut *conn).fetch(sql.as_str());
            let rows = std::iter::from_fn(|| runtime.block_on(fetched.try_next()).transpose())
                .map(|row| {
                    row.and_then(|row| raw_row(&row, policy))
                        .map_err(|e| connectivity(plan.table(), e))
                });
            deliver_pages(plan, rows, PAGE_SIZE, sink)?;
        }
        Ok(())
    }
}

/// Hand `rows` to `sink` in runs of `page_size`, returning the row count
///
/// The first row or sink error stops delivery; rows buffered before it are
/// discarded.
fn deliver_pages<I>(
    plan: &TablePlan,
    rows: I,
    page_size: usize,
    sink: &mut RowSink<'_>,
) -> Result<usize>
where
    I: IntoIterator<Item = Result<RawRow>>,
{
    let mut delivered = 0;
    let mut page: Vec<RawRow> = Vec::with_capacity(page_size);
    for row in rows {
        page.push(row?);
        if page.len() == page_size {
            delivered += page.len();
            sink(plan, std::mem::replace(&mut page, Vec::with_capacity(page_size)))?;
        }
    }
    if !page.is_empty() {
        delivered += page.len();
        sink(plan, page)?;
    }
    Ok(delivered)
}

fn connect_options(settings: &LiveSettings) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .password(settings.password.expose())
        .database(&settings.database)
}

fn is_unknown_charset(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        let number = db
            .try_downcast_ref::<MySqlDatabaseError>()
            .map(MySqlDatabaseError::number);
        if number == Some(ER_UNKNOWN_CHARACTER_SET) {
            return true;
        }
    }
    err.to_string().contains("Unknown character set")
}

fn raw_row(row: &MySqlRow, policy: DecodePolicy) -> std::result::Result<RawRow, sqlx::Error> {
    decode_cells((0..row.len()).map(|i| row.try_get_unchecked::<Option<&[u8]>, _>(i)), policy)
}

/// NULL stays `None`; every other cell is its text rendering decoded under `policy`
fn decode_cells<'r, I>(cells: I, policy: DecodePolicy) -> std::result::Result<RawRow, sqlx::Error>
where
    I: IntoIterator<Item = std::result::Result<Option<&'r [u8]>, sqlx::Error>>,
{
    cells
        .into_iter()
        .map(|cell| Ok(cell?.map(|bytes| policy.decode(bytes).into_owned())))
        .collect()
}
