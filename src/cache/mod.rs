//! Cache Module
//!
//! Fetch cache for backend resources: freshness windows, in-flight request
//! deduplication and an optional LRU bound.

mod clock;
mod entry;
mod lru;
mod stats;
mod store;
mod watch;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{is_fresh, CacheEntry};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::{CacheOptions, FetchCache, FetchPolicy, ResourceState};
pub use watch::WatchedInputs;
