//! Global atomic counters for scoring observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (the engine does so at the end of every round).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters; no allocations, no locking.
pub struct Metrics {
    oracle_calls: AtomicU64,
    oracle_failures: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    coalesced_waits: AtomicU64,
    empty_submissions: AtomicU64,
    storage_errors: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            oracle_calls: AtomicU64::new(0),
            oracle_failures: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            coalesced_waits: AtomicU64::new(0),
            empty_submissions: AtomicU64::new(0),
            storage_errors: AtomicU64::new(0),
        }
    }

    pub fn inc_oracle_calls(&self) {
        self.oracle_calls.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "oracle_calls", "counter incremented");
    }

    pub fn inc_oracle_failures(&self) {
        self.oracle_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "oracle_failures", "counter incremented");
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cache_hits", "counter incremented");
    }

    pub fn inc_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cache_misses", "counter incremented");
    }

    /// A caller joined an oracle call already in flight for its key.
    pub fn inc_coalesced_waits(&self) {
        self.coalesced_waits.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "coalesced_waits", "counter incremented");
    }

    pub fn inc_empty_submissions(&self) {
        self.empty_submissions.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "empty_submissions", "counter incremented");
    }

    pub fn inc_storage_errors(&self) {
        self.storage_errors.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "storage_errors", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            oracle_calls = self.oracle_calls(),
            oracle_failures = self.oracle_failures(),
            cache_hits = self.cache_hits(),
            cache_misses = self.cache_misses(),
            coalesced_waits = self.coalesced_waits(),
            empty_submissions = self.empty_submissions(),
            storage_errors = self.storage_errors(),
        );
    }

    pub fn oracle_calls(&self) -> u64 {
        self.oracle_calls.load(Ordering::Relaxed)
    }

    pub fn oracle_failures(&self) -> u64 {
        self.oracle_failures.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn coalesced_waits(&self) -> u64 {
        self.coalesced_waits.load(Ordering::Relaxed)
    }

    pub fn empty_submissions(&self) -> u64 {
        self.empty_submissions.load(Ordering::Relaxed)
    }

    pub fn storage_errors(&self) -> u64 {
        self.storage_errors.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.oracle_calls.store(0, Ordering::Relaxed);
        self.oracle_failures.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.coalesced_waits.store(0, Ordering::Relaxed);
        self.empty_submissions.store(0, Ordering::Relaxed);
        self.storage_errors.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.oracle_calls(), 0);
        m.inc_oracle_calls();
        m.inc_oracle_calls();
        assert_eq!(m.oracle_calls(), 2);

        m.inc_cache_hits();
        assert_eq!(m.cache_hits(), 1);

        m.inc_coalesced_waits();
        m.inc_empty_submissions();
        m.inc_empty_submissions();
        assert_eq!(m.coalesced_waits(), 1);
        assert_eq!(m.empty_submissions(), 2);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_oracle_calls();
        m.inc_oracle_failures();
        m.inc_cache_misses();
        m.inc_storage_errors();
        m.reset();
        assert_eq!(m.oracle_calls(), 0);
        assert_eq!(m.oracle_failures(), 0);
        assert_eq!(m.cache_misses(), 0);
        assert_eq!(m.storage_errors(), 0);
    }
}
