//! Operation counters and timings
//!
//! Engines report counts and durations through [`MetricsSink`]. Sinks are
//! fire-and-forget: they must not panic and their failures never reach the
//! caller. The default sink emits `tracing` events; tests use
//! [`RecordingSink`] to assert on what was reported.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Destination for operation metrics
pub trait MetricsSink: Send + Sync {
    /// Add `value` to the named counter
    fn increment(&self, name: &str, value: u64, labels: &[(&str, &str)]);

    /// Record one timed run of the named operation
    fn record_duration(&self, name: &str, elapsed: Duration, labels: &[(&str, &str)]);
}

/// Default sink: debug-level tracing events
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn increment(&self, name: &str, value: u64, labels: &[(&str, &str)]) {
        debug!(metric = name, value, ?labels, "counter");
    }

    fn record_duration(&self, name: &str, elapsed: Duration, labels: &[(&str, &str)]) {
        debug!(metric = name, elapsed_ms = elapsed.as_millis() as u64, ?labels, "duration");
    }
}

/// Sink that drops everything
pub struct NullSink;

impl MetricsSink for NullSink {
    fn increment(&self, _name: &str, _value: u64, _labels: &[(&str, &str)]) {}
    fn record_duration(&self, _name: &str, _elapsed: Duration, _labels: &[(&str, &str)]) {}
}

/// One captured counter increment
#[derive(Debug, Clone, PartialEq)]
pub struct CounterEvent {
    pub name: String,
    pub value: u64,
    pub labels: Vec<(String, String)>,
}

/// One captured duration sample
#[derive(Debug, Clone)]
pub struct DurationEvent {
    pub name: String,
    pub elapsed: Duration,
    pub labels: Vec<(String, String)>,
}

/// Capturing sink for tests
#[derive(Default)]
pub struct RecordingSink {
    counters: Mutex<Vec<CounterEvent>>,
    durations: Mutex<Vec<DurationEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> Vec<CounterEvent> {
        self.counters.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn durations(&self) -> Vec<DurationEvent> {
        self.durations.lock().map(|d| d.clone()).unwrap_or_default()
    }

    /// Sum of all increments recorded under `name`
    pub fn counter_total(&self, name: &str) -> u64 {
        self.counters()
            .iter()
            .filter(|e| e.name == name)
            .map(|e| e.value)
            .sum()
    }
}

fn owned_labels(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl MetricsSink for RecordingSink {
    fn increment(&self, name: &str, value: u64, labels: &[(&str, &str)]) {
        if let Ok(mut counters) = self.counters.lock() {
            counters.push(CounterEvent {
                name: name.to_string(),
                value,
                labels: owned_labels(labels),
            });
        }
    }

    fn record_duration(&self, name: &str, elapsed: Duration, labels: &[(&str, &str)]) {
        if let Ok(mut durations) = self.durations.lock() {
            durations.push(DurationEvent {
                name: name.to_string(),
                elapsed,
                labels: owned_labels(labels),
            });
        }
    }
}

/// Time a block and report it under `name` when dropped
pub struct OperationTimer<'a> {
    sink: &'a dyn MetricsSink,
    name: &'a str,
    started: Instant,
}

impl<'a> OperationTimer<'a> {
    pub fn start(sink: &'a dyn MetricsSink, name: &'a str) -> Self {
        OperationTimer {
            sink,
            name,
            started: Instant::now(),
        }
    }
}

impl Drop for OperationTimer<'_> {
    fn drop(&mut self) {
        self.sink
            .record_duration(self.name, self.started.elapsed(), &[]);
    }
}
