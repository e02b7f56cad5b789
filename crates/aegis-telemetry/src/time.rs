// Path: crates/aegis-telemetry/src/time.rs
use crate::sinks::ValidationMetricsSink;
use std::time::Instant;

/// An RAII timer that reports its elapsed duration to a
/// [`ValidationMetricsSink`] when dropped, whatever the exit path.
pub struct Timer<'a> {
    sink: &'a dyn ValidationMetricsSink,
    start: Instant,
}

impl<'a> Timer<'a> {
    pub fn new(sink: &'a dyn ValidationMetricsSink) -> Self {
        Self {
            sink,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.sink
            .observe_validation_duration(self.start.elapsed().as_secs_f64());
    }
}
