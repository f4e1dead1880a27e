//! Test capture mode for logging assertions
//!
//! A test-only subscriber layer that records events in memory so tests can
//! assert on which operations ran, which tables they touched and how they
//! ended.

use snapcache_core_types::schema::EVENT_PROGRESS;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// A captured log event with all its fields
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub op: Option<String>,
    pub event: Option<String>,
    pub table: Option<String>,
    pub fields: HashMap<String, String>,
}

#[derive(Default)]
struct FieldVisitor {
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }
}

/// Layer that appends every event to a shared buffer
pub struct TestCaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCaptureLayer {
    pub fn new() -> (Self, TestCapture) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let layer = Self {
            events: events.clone(),
        };
        (layer, TestCapture { events })
    }
}

impl<S> Layer<S> for TestCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let captured = CapturedEvent {
            level: *event.metadata().level(),
            op: visitor.fields.get("op").cloned(),
            event: visitor.fields.get("event").cloned(),
            table: visitor.fields.get("table").cloned(),
            fields: visitor.fields,
        };

        self.events
            .lock()
            .map(|mut events| events.push(captured))
            .ok();
    }
}

/// Handle for accessing captured events in tests
#[derive(Clone)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// First event for `op` with the given event name, optionally scoped to a table
    pub fn find(&self, op: &str, event: &str, table: Option<&str>) -> Option<CapturedEvent> {
        self.events().into_iter().find(|e| {
            e.op.as_deref() == Some(op)
                && e.event.as_deref() == Some(event)
                && (table.is_none() || e.table.as_deref() == table)
        })
    }

    /// Assert that an event exists with the given operation and event type
    ///
    /// # Panics
    ///
    /// Panics if the event is not found
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        assert!(
            self.find(op, event, None).is_some(),
            "Expected event op={} event={} not found in {} captured events",
            op,
            event,
            self.events().len()
        );
    }

    /// Messages of every captured progress event, in emission order
    pub fn progress_messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.event.as_deref() == Some(EVENT_PROGRESS))
            .filter_map(|e| e.fields.get("message").cloned())
            .collect()
    }

    /// Count events matching a predicate
    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Initialize test capture mode
///
/// Installs the capture layer as the global subscriber on first use and
/// returns a handle to the shared buffer. Tests run in parallel, so assert
/// on events filtered by something unique to the test (a table name, an op).
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let (layer, capture) = TestCaptureLayer::new();
            tracing_subscriber::registry().with(layer).init();
            capture
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_records_table_field() {
        let capture = init_test_capture();
        tracing::info!(op = "capture_self_test", event = "start", table = "t_capture");

        let n = capture.count_events(|e| {
            e.op.as_deref() == Some("capture_self_test") && e.table.as_deref() == Some("t_capture")
        });
        assert_eq!(n, 1);
    }

    #[test]
    fn test_progress_messages_are_collected() {
        let capture = init_test_capture();
        tracing::info!(event = EVENT_PROGRESS, "capture_self_test: 3 rows imported.");

        assert!(capture
            .progress_messages()
            .contains(&"capture_self_test: 3 rows imported.".to_string()));
    }
}
