//! Progress reporting
//!
//! Progress messages go to a caller-supplied sink and are mirrored as
//! `event=progress` log events. The sink is untrusted: a panic inside it is
//! caught and logged so that an import never dies on a reporting failure.

use snapcache_core_types::schema::EVENT_PROGRESS;
use std::panic::{catch_unwind, AssertUnwindSafe};

pub struct Progress<'a> {
    sink: &'a mut dyn FnMut(&str),
    panics: usize,
}

impl<'a> Progress<'a> {
    pub fn new(sink: &'a mut dyn FnMut(&str)) -> Self {
        Self { sink, panics: 0 }
    }

    pub fn report(&mut self, message: &str) {
        tracing::info!(event = EVENT_PROGRESS, "{}", message);

        let sink = &mut *self.sink;
        if catch_unwind(AssertUnwindSafe(|| sink(message))).is_err() {
            self.panics += 1;
            tracing::warn!(
                progress_message = message,
                "progress callback panicked; continuing"
            );
        }
    }

    /// Number of messages whose delivery panicked
    pub fn panics(&self) -> usize {
        self.panics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_reach_sink_in_order() {
        let mut seen = Vec::new();
        let mut sink = |msg: &str| seen.push(msg.to_string());
        let mut progress = Progress::new(&mut sink);

        progress.report("one");
        progress.report("two");
        drop(progress);

        assert_eq!(seen, vec!["one", "two"]);
    }

    #[test]
    fn test_panicking_sink_is_contained() {
        let mut calls = 0;
        let mut sink = |_: &str| {
            calls += 1;
            panic!("sink failure");
        };
        let mut progress = Progress::new(&mut sink);

        progress.report("one");
        progress.report("two");

        assert_eq!(progress.panics(), 2);
        drop(progress);
        assert_eq!(calls, 2);
    }
}
