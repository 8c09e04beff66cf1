//! Cache Entry Module
//!
//! Defines the stored snapshot for one key and the freshness predicate.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

// == Cache Entry ==
/// The latest known-good value for a key.
///
/// Value and timestamp are only ever replaced together by swapping the
/// whole entry.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// The stored snapshot
    pub value: Arc<V>,
    /// Wall-clock time the value was obtained
    pub fetched_at: DateTime<Utc>,
}

impl<V> Clone for CacheEntry<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            fetched_at: self.fetched_at,
        }
    }
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    pub fn new(value: Arc<V>, fetched_at: DateTime<Utc>) -> Self {
        Self { value, fetched_at }
    }

    // == Is Fresh ==
    /// Checks the entry against a freshness window at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        is_fresh(now, self.fetched_at, ttl)
    }

    // == Age ==
    /// Time elapsed since the value was fetched, zero if the clock went backwards.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or(Duration::ZERO)
    }
}

// == Freshness Predicate ==
/// An entry fetched at `fetched_at` is fresh while `now - fetched_at < ttl`.
///
/// Boundary condition: at exactly `fetched_at + ttl` the entry is stale, so a
/// zero ttl never serves from cache. A ttl too large for chrono never expires.
pub fn is_fresh(now: DateTime<Utc>, fetched_at: DateTime<Utc>, ttl: Duration) -> bool {
    let window = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
    now - fetched_at < window
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_fresh_inside_window() {
        assert!(is_fresh(at(0), at(0), Duration::from_secs(300)));
        assert!(is_fresh(at(299), at(0), Duration::from_secs(300)));
    }

    #[test]
    fn test_stale_at_boundary() {
        assert!(!is_fresh(at(300), at(0), Duration::from_secs(300)));
        assert!(!is_fresh(at(301), at(0), Duration::from_secs(300)));
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        assert!(!is_fresh(at(0), at(0), Duration::ZERO));
    }

    #[test]
    fn test_clock_moving_backwards_stays_fresh() {
        assert!(is_fresh(at(-10), at(0), Duration::from_secs(1)));
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        assert!(is_fresh(at(1_000_000), at(0), Duration::MAX));
    }

    #[test]
    fn test_entry_age() {
        let entry = CacheEntry::new(Arc::new("v"), at(0));
        assert_eq!(entry.age(at(42)), Duration::from_secs(42));
        assert_eq!(entry.age(at(-5)), Duration::ZERO);
        assert!(entry.is_fresh(at(42), Duration::from_secs(60)));
    }

    #[test]
    fn test_clone_shares_value() {
        let entry = CacheEntry::new(Arc::new(String::from("v")), at(0));
        let copy = entry.clone();
        assert!(Arc::ptr_eq(&entry.value, &copy.value));
        assert_eq!(entry.fetched_at, copy.fetched_at);
    }
}
