//! Canonical logging macros
//!
//! Operation boundaries are logged with a fixed field set so that a run can
//! be reconstructed from the event stream.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use snapcache_core::log_op_start;
/// log_op_start!("ensure_cache");
/// log_op_start!("load_table", table = "patients");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = snapcache_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = snapcache_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use snapcache_core::log_op_end;
/// log_op_end!("load_table", duration_ms = 42, rows = 1001);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = snapcache_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = snapcache_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// # Example
///
/// ```
/// # use snapcache_core::log_op_error;
/// # use snapcache_core::errors::{ImportError, ImportErrorKind};
/// let err = ImportError::new(ImportErrorKind::Format).with_table("patients");
/// log_op_error!("load_table", &err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let err: &$crate::errors::ImportError = $err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = snapcache_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?err.kind(),
            err_code = err.code(),
            err_message = err.message(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let err: &$crate::errors::ImportError = $err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = snapcache_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?err.kind(),
            err_code = err.code(),
            err_message = err.message(),
            $($field)*
        );
    }};
}
