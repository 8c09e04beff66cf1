//! Cache Statistics Module
//!
//! Tracks fetch cache counters: hits, misses, deduplicated joins, backend
//! fetches, failures and evictions.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CacheStats {
    /// Lookups answered from a fresh entry
    pub hits: u64,
    /// Lookups that started a backend call
    pub misses: u64,
    /// Lookups that attached to a call already in flight
    pub joins: u64,
    /// Backend calls that succeeded
    pub fetches: u64,
    /// Backend calls that failed
    pub failures: u64,
    /// Entries dropped by the capacity bound
    pub evictions: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Backend calls currently in progress
    pub in_flight: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Share of lookups served without a new backend call.
    ///
    /// Joins count as hits. Returns 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.joins;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_join(&mut self) {
        self.joins += 1;
    }

    pub fn record_fetch(&mut self) {
        self.fetches += 1;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }
}
