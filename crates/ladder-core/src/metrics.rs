//! Global atomic counters for the result lifecycle.
//!
//! Counters are incremented at the call site. Call [`Metrics::flush`] to
//! emit current values as a single `tracing::info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    results_created: AtomicU64,
    results_completed: AtomicU64,
    results_failed: AtomicU64,
    attempts_scheduled: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            results_created: AtomicU64::new(0),
            results_completed: AtomicU64::new(0),
            results_failed: AtomicU64::new(0),
            attempts_scheduled: AtomicU64::new(0),
        }
    }

    pub fn inc_results_created(&self) {
        self.results_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_results_completed(&self) {
        self.results_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_results_failed(&self) {
        self.results_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_attempts_scheduled(&self) {
        self.attempts_scheduled.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "attempts_scheduled", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            results_created = self.results_created(),
            results_completed = self.results_completed(),
            results_failed = self.results_failed(),
            attempts_scheduled = self.attempts_scheduled(),
        );
    }

    pub fn results_created(&self) -> u64 {
        self.results_created.load(Ordering::Relaxed)
    }

    pub fn results_completed(&self) -> u64 {
        self.results_completed.load(Ordering::Relaxed)
    }

    pub fn results_failed(&self) -> u64 {
        self.results_failed.load(Ordering::Relaxed)
    }

    pub fn attempts_scheduled(&self) -> u64 {
        self.attempts_scheduled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment_independently() {
        let m = Metrics::new();
        m.inc_results_created();
        m.inc_results_created();
        m.inc_results_completed();
        m.inc_attempts_scheduled();

        assert_eq!(m.results_created(), 2);
        assert_eq!(m.results_completed(), 1);
        assert_eq!(m.results_failed(), 0);
        assert_eq!(m.attempts_scheduled(), 1);
        m.flush();
    }
}
