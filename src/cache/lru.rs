//! LRU Tracker Module
//!
//! Least Recently Used ordering for the optional cache capacity bound.

use std::collections::VecDeque;

// == LRU Tracker ==
/// Tracks read and write order of cached keys.
///
/// Keys are stored in a VecDeque where:
/// - Front = Most recently used
/// - Back = Least recently used
#[derive(Debug, Default)]
pub struct LruTracker {
    order: VecDeque<String>,
}

impl LruTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as recently used (moves to front).
    pub fn touch(&mut self, key: &str) {
        self.remove(key);
        self.order.push_front(key.to_string());
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    // == Evict Candidate ==
    /// Removes and returns the least recently used key that `eligible` accepts.
    ///
    /// Keys rejected by `eligible` keep their position.
    pub fn evict_where(&mut self, mut eligible: impl FnMut(&str) -> bool) -> Option<String> {
        let index = self.order.iter().rposition(|k| eligible(k))?;
        self.order.remove(index)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[cfg(test)]
    fn peek_oldest(&self) -> Option<&String> {
        self.order.back()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_orders_keys() {
        let mut lru = LruTracker::new();

        lru.touch("products-list");
        lru.touch("product-1");
        lru.touch("product-2");

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some(&"products-list".to_string()));

        lru.touch("products-list");
        assert_eq!(lru.peek_oldest(), Some(&"product-1".to_string()));
    }

    #[test]
    fn test_touch_same_key_keeps_one_slot() {
        let mut lru = LruTracker::new();
        lru.touch("product-1");
        lru.touch("product-1");
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_evict_oldest_eligible() {
        let mut lru = LruTracker::new();
        lru.touch("a");
        lru.touch("b");
        lru.touch("c");

        assert_eq!(lru.evict_where(|_| true), Some("a".to_string()));
        assert_eq!(lru.evict_where(|_| true), Some("b".to_string()));
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_evict_skips_ineligible_keys() {
        let mut lru = LruTracker::new();
        lru.touch("pinned");
        lru.touch("b");
        lru.touch("c");

        assert_eq!(lru.evict_where(|k| k != "pinned"), Some("b".to_string()));
        assert_eq!(lru.peek_oldest(), Some(&"pinned".to_string()));
    }

    #[test]
    fn test_evict_empty_or_nothing_eligible() {
        let mut lru = LruTracker::new();
        assert_eq!(lru.evict_where(|_| true), None);

        lru.touch("a");
        assert_eq!(lru.evict_where(|_| false), None);
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut lru = LruTracker::new();
        lru.touch("a");
        lru.touch("b");
        lru.remove("a");
        lru.remove("missing");
        assert_eq!(lru.len(), 1);
        assert_eq!(lru.peek_oldest(), Some(&"b".to_string()));
    }
}
