use std::fmt;

/// Receives progress percentages in `[0, 100]`.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: f64);
}

impl<F> ProgressSink for F
where
    F: Fn(f64) + Send + Sync,
{
    fn report(&self, percent: f64) {
        self(percent)
    }
}

/// Sink that drops every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _percent: f64) {}
}

/// Wraps a sink and keeps reported values monotonic and within `[0, 100]`.
pub struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    current: f64,
}

impl fmt::Debug for ProgressTracker<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("current", &self.current)
            .finish()
    }
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self { sink, current: 0.0 }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// Move to `percent` if it is ahead of the current value.
    pub fn advance_to(&mut self, percent: f64) {
        let next = percent.clamp(0.0, 100.0);
        if next > self.current {
            self.current = next;
            self.sink.report(next);
        }
    }

    pub fn complete(&mut self) {
        self.advance_to(100.0);
    }
}
