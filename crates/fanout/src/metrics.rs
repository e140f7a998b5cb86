//! Engine metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::error::FanoutError;

/// Counters for one [`Fanout`](crate::Fanout) instance, cumulative across calls
#[derive(Debug, Default)]
pub struct FanoutMetrics {
    /// Jobs handed to a worker
    dispatched: AtomicU64,
    /// Jobs whose work function returned Ok
    succeeded: AtomicU64,
    /// Jobs whose work function returned an error
    failed: AtomicU64,
    /// Jobs skipped for lack of an execution context
    invalid_context: AtomicU64,
    /// Jobs whose work function panicked or was aborted
    panicked: AtomicU64,
    /// Invocations currently running
    active: AtomicUsize,
    /// Highest number of simultaneous invocations seen
    peak_active: AtomicUsize,
}

impl FanoutMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn inc_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn inc_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn invalid_context(&self) -> u64 {
        self.invalid_context.load(Ordering::Relaxed)
    }

    pub fn panicked(&self) -> u64 {
        self.panicked.load(Ordering::Relaxed)
    }

    /// Count a failure under its category
    pub fn record_failure(&self, error: &FanoutError) {
        let counter = match error {
            FanoutError::Worker { .. } => &self.failed,
            FanoutError::InvalidContext { .. } => &self.invalid_context,
            FanoutError::WorkerPanicked { .. } | FanoutError::Aborted { .. } => &self.panicked,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn peak_active(&self) -> usize {
        self.peak_active.load(Ordering::Relaxed)
    }

    /// Mark an invocation as running until the guard is dropped
    pub fn enter(&self) -> ActiveGuard<'_> {
        let now = self.active.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_active.fetch_max(now, Ordering::AcqRel);
        ActiveGuard { metrics: self }
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            dispatched: self.dispatched(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            invalid_context: self.invalid_context(),
            panicked: self.panicked(),
            peak_active: self.peak_active(),
        }
    }
}

/// Decrements the active count on drop
#[derive(Debug)]
pub struct ActiveGuard<'a> {
    metrics: &'a FanoutMetrics,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.metrics.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Snapshot of engine metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub invalid_context: u64,
    pub panicked: u64,
    pub peak_active: usize,
}

impl MetricsSnapshot {
    /// Results collected, of any kind
    pub fn completed(&self) -> u64 {
        self.succeeded + self.errors()
    }

    /// Results routed to the error handler
    pub fn errors(&self) -> u64 {
        self.failed + self.invalid_context + self.panicked
    }
}
