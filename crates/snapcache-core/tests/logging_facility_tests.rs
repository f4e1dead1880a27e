#![allow(clippy::unwrap_used, clippy::expect_used)]

use snapcache_core::errors::{ImportError, ImportErrorKind};
use snapcache_core::logging_facility::test_capture::init_test_capture;
use snapcache_core::{log_op_end, log_op_error, log_op_start};
use snapcache_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

#[test]
fn test_log_op_start_with_table_field() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name, table = "patients");

    let events = capture.events();
    let start = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START))
        .expect("start event captured");
    assert_eq!(start.table.as_deref(), Some("patients"));
}

#[test]
fn test_log_op_end_records_duration() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42, rows = 1001);

    let events = capture.events();
    let end_events: Vec<_> = events
        .iter()
        .filter(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END))
        .collect();

    assert_eq!(end_events.len(), 1);
    assert_eq!(end_events[0].fields.get("duration_ms"), Some(&"42".to_string()));
    assert_eq!(end_events[0].fields.get("rows"), Some(&"1001".to_string()));
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = ImportError::new(ImportErrorKind::Format)
        .with_table("receipts")
        .with_message("unterminated value tuple");
    log_op_error!(op_name, &err, duration_ms = 10);

    let events = capture.events();
    let error_event = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("error event captured");
    assert_eq!(
        error_event.fields.get("err_code"),
        Some(&"ERR_FORMAT".to_string())
    );
    assert_eq!(
        error_event.fields.get("err_message"),
        Some(&"unterminated value tuple".to_string())
    );
}
