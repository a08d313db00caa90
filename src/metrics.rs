//! Timing hooks around index operations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Timed index operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// [`crate::SearchableMessageMap::insert`].
    Insert,
    /// [`crate::SearchableMessageMap::remove`].
    Remove,
}

/// Receiver of operation timings.
pub trait MetricsSink: Send + Sync {
    /// `operation` completed in `elapsed`.
    fn record(&self, operation: Operation, elapsed: Duration);
}

/// Sink dropping every measurement.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record(&self, _operation: Operation, _elapsed: Duration) {}
}

/// Count, total and maximum duration of one operation.
#[derive(Debug, Default)]
pub struct TimeMeter {
    count: AtomicU64,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

/// Point-in-time copy of a [`TimeMeter`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeMeterSnapshot {
    /// Completed operations.
    pub count: u64,
    /// Time spent in all of them.
    pub total: Duration,
    /// Slowest one.
    pub max: Duration,
}

impl TimeMeter {
    fn add(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
    }

    /// Current values.
    pub fn snapshot(&self) -> TimeMeterSnapshot {
        TimeMeterSnapshot {
            count: self.count.load(Ordering::Relaxed),
            total: Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed)),
            max: Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed)),
        }
    }
}

/// Sink keeping a [`TimeMeter`] per operation.
#[derive(Debug, Default)]
pub struct TimeMeters {
    /// Insert timings.
    pub insert: TimeMeter,
    /// Remove timings.
    pub remove: TimeMeter,
}

impl MetricsSink for TimeMeters {
    fn record(&self, operation: Operation, elapsed: Duration) {
        match operation {
            Operation::Insert => self.insert.add(elapsed),
            Operation::Remove => self.remove.add(elapsed),
        }
    }
}

/// Reports the time between its creation and drop to a sink.
pub(crate) struct TimeMeasurement<'a> {
    sink: &'a dyn MetricsSink,
    operation: Operation,
    start: Instant,
}

impl<'a> TimeMeasurement<'a> {
    pub(crate) fn new(sink: &'a dyn MetricsSink, operation: Operation) -> Self {
        TimeMeasurement {
            sink,
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for TimeMeasurement<'_> {
    fn drop(&mut self) {
        self.sink.record(self.operation, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_reaches_meter() {
        let meters = TimeMeters::default();
        {
            let _measurement = TimeMeasurement::new(&meters, Operation::Remove);
        }
        meters.record(Operation::Remove, Duration::from_millis(5));
        let snapshot = meters.remove.snapshot();
        assert_eq!(snapshot.count, 2);
        assert!(snapshot.max >= Duration::from_millis(5));
        assert_eq!(meters.insert.snapshot().count, 0);
    }
}
