//! Global atomic counters for autograde observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a grading run).
//! They never feed back into scoring.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters without allocation or locking.
pub struct Metrics {
    tasks_evaluated: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_timed_out: AtomicU64,
    retries: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            tasks_evaluated: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            tasks_timed_out: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    /// A criterion produced an evaluation.
    pub fn inc_tasks_evaluated(&self) {
        self.tasks_evaluated.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "tasks_evaluated", "counter incremented");
    }

    /// A criterion ended in a failure other than timeout.
    pub fn inc_tasks_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "tasks_failed", "counter incremented");
    }

    /// A criterion was still outstanding at the batch deadline.
    pub fn inc_tasks_timed_out(&self) {
        self.tasks_timed_out.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "tasks_timed_out", "counter incremented");
    }

    /// A judge call was retried after a transient error.
    pub fn inc_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "retries", "counter incremented");
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cache_hits", "counter incremented");
    }

    pub fn inc_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cache_misses", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            tasks_evaluated = self.tasks_evaluated(),
            tasks_failed = self.tasks_failed(),
            tasks_timed_out = self.tasks_timed_out(),
            retries = self.retries(),
            cache_hits = self.cache_hits(),
            cache_misses = self.cache_misses(),
        );
    }

    pub fn tasks_evaluated(&self) -> u64 {
        self.tasks_evaluated.load(Ordering::Relaxed)
    }

    pub fn tasks_failed(&self) -> u64 {
        self.tasks_failed.load(Ordering::Relaxed)
    }

    pub fn tasks_timed_out(&self) -> u64 {
        self.tasks_timed_out.load(Ordering::Relaxed)
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.tasks_evaluated.store(0, Ordering::Relaxed);
        self.tasks_failed.store(0, Ordering::Relaxed);
        self.tasks_timed_out.store(0, Ordering::Relaxed);
        self.retries.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
    }
}
