//! Engine and routing metrics.
//!
//! Counters for engine cache behaviour and translation outcomes. Evictions
//! are the signal to watch: under concurrent traffic for different pairs the
//! single slot thrashes, and every thrash shows up here as an eviction
//! followed by a load.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Acquisitions served by the already-resident engine
    cache_hits: AtomicUsize,

    /// Successful engine instantiations
    loads: AtomicUsize,

    /// Resident engines destroyed to make room for another pair
    evictions: AtomicUsize,

    load_failures: AtomicUsize,
    load_timeouts: AtomicUsize,

    /// Callers that joined an instantiation already in flight
    deduplicated_waits: AtomicUsize,

    translations: AtomicUsize,
    pivot_translations: AtomicUsize,
    identity_translations: AtomicUsize,
    runtime_errors: AtomicUsize,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_timeout(&self) {
        self.load_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deduplicated_wait(&self) {
        self.deduplicated_waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed translation. `hops` is 0 for identity, 2 for pivot.
    pub fn record_translation(&self, hops: usize) {
        self.translations.fetch_add(1, Ordering::Relaxed);
        match hops {
            0 => {
                self.identity_translations.fetch_add(1, Ordering::Relaxed);
            }
            1 => {}
            _ => {
                self.pivot_translations.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_runtime_error(&self) {
        self.runtime_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self) -> MetricsReport {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let loads = self.loads.load(Ordering::Relaxed);
        let acquisitions = hits + loads;
        let cache_hit_rate = if acquisitions > 0 {
            (hits as f64 / acquisitions as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            cache_hits: hits,
            loads,
            cache_hit_rate,
            evictions: self.evictions.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            load_timeouts: self.load_timeouts.load(Ordering::Relaxed),
            deduplicated_waits: self.deduplicated_waits.load(Ordering::Relaxed),
            translations: self.translations.load(Ordering::Relaxed),
            pivot_translations: self.pivot_translations.load(Ordering::Relaxed),
            identity_translations: self.identity_translations.load(Ordering::Relaxed),
            runtime_errors: self.runtime_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub cache_hits: usize,
    pub loads: usize,

    /// Cache hit rate as a percentage (0-100)
    pub cache_hit_rate: f64,

    pub evictions: usize,
    pub load_failures: usize,
    pub load_timeouts: usize,
    pub deduplicated_waits: usize,
    pub translations: usize,
    pub pivot_translations: usize,
    pub identity_translations: usize,
    pub runtime_errors: usize,
}
