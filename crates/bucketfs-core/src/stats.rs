//! Lock-free counters for the attribute cache.
//!
//! ```
//! use bucketfs_core::stats::CacheStats;
//!
//! let stats = CacheStats::new();
//! stats.record_hit();
//! stats.record_miss();
//! assert_eq!(stats.hit_rate(), 0.5);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Statistics for cache operations.
///
/// All counters use relaxed atomics; values are monotonic between resets
/// but not synchronized with each other.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups answered from the cache (positive or negative entries).
    pub hits: AtomicU64,
    /// Lookups that had to go to the store.
    pub misses: AtomicU64,
    /// Entries written.
    pub inserts: AtomicU64,
    /// Entries removed by explicit invalidation.
    pub invalidations: AtomicU64,
    /// Entries dropped for capacity or TTL.
    pub evictions: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn eviction_count(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Hit rate in `0.0..=1.0`, 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hit_count();
        let total = hits + self.miss_count();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.inserts,
            &self.invalidations,
            &self.evictions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Copies the counters, together with the current entry count.
    pub fn snapshot(&self, entries: u64) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hit_count(),
            misses: self.miss_count(),
            inserts: self.inserts.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            evictions: self.eviction_count(),
            entries,
        }
    }
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub invalidations: u64,
    pub evictions: u64,
    pub entries: u64,
}

impl CacheStatsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_reset() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_insert();
        stats.record_eviction();

        let snap = stats.snapshot(3);
        assert_eq!(snap.hits, 2);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.inserts, 1);
        assert_eq!(snap.evictions, 1);
        assert_eq!(snap.entries, 3);
        assert!((snap.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);

        stats.reset();
        assert_eq!(stats.snapshot(0), CacheStatsSnapshot::default());
    }

    #[test]
    fn test_hit_rate_empty() {
        assert!(CacheStats::new().hit_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = CacheStats::new();
        stats.record_miss();
        let json = serde_json::to_string(&stats.snapshot(0)).unwrap();
        assert!(json.contains("\"misses\":1"));
    }
}
