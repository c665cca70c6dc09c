//! TTL-bounded attribute cache backed by Moka.
//!
//! Entries map `(path, attribute kind)` to either a snapshot or an explicit
//! "confirmed absent" marker. The two are different: a negative entry answers
//! `exists` without a store round trip, while a missing entry means the store
//! has not been asked yet.
//!
//! # Expiration
//!
//! Each entry lives for the configured TTL from the moment it is written.
//! Overwriting an entry restarts its TTL; reading it does not. Staleness is
//! therefore bounded by wall-clock time no matter how hot a path is.
//!
//! # Views
//!
//! A POSIX snapshot contains everything a basic snapshot does, so
//! [`AttributesCache::put`] with a POSIX snapshot fills both keys. A basic
//! snapshot only fills the basic key.
//!
//! # Concurrency
//!
//! All methods take `&self` and are safe to call from any thread. A miss in
//! [`AttributesCache::get`] is not single-flight: two threads missing the
//! same cold key may both call the fetcher, and the later write wins.
//!
//! # Tracing
//!
//! Enable the `cache-tracing` feature for per-entry hit/miss events.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::notification::RemovalCause;
use tracing::debug;

use crate::attributes::{AttributeKind, AttributeSnapshot};
use crate::config::FsConfig;
use crate::error::FsResult;
use crate::path::BucketPath;
use crate::stats::{CacheStats, CacheStatsSnapshot};

#[cfg(feature = "cache-tracing")]
macro_rules! cache_event {
    ($level:ident, $($arg:tt)*) => {
        tracing::$level!($($arg)*)
    };
}

#[cfg(not(feature = "cache-tracing"))]
macro_rules! cache_event {
    ($level:ident, $($arg:tt)*) => {};
}

/// Cached value: `None` is a negative entry.
#[derive(Debug, Clone)]
struct CachedEntry {
    value: Option<AttributeSnapshot>,
    ttl: Duration,
}

/// Fixed expiration: the TTL restarts on create and update only.
///
/// `expire_after_read` keeps Moka's default, which returns the remaining
/// duration unchanged.
struct FixedExpiry;

impl Expiry<String, CachedEntry> for FixedExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Outcome of asking the store for a path's attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// Attributes of a stored object. Cached.
    Stored(AttributeSnapshot),
    /// Attributes made up for something with no stored object of its own,
    /// such as an implicit directory. Returned but never cached.
    Synthesized(AttributeSnapshot),
    /// Confirmed absent. Cached as a negative entry.
    Absent,
}

/// Loads attributes on a cache miss.
pub trait AttributeFetcher {
    fn fetch(&self, path: &BucketPath, kind: AttributeKind) -> FsResult<Fetched>;
}

impl<F> AttributeFetcher for F
where
    F: Fn(&BucketPath, AttributeKind) -> FsResult<Fetched>,
{
    fn fetch(&self, path: &BucketPath, kind: AttributeKind) -> FsResult<Fetched> {
        self(path, kind)
    }
}

/// Cache key for `path` viewed as `kind`.
///
/// Format is `<bucket>_<key>_<tag>`. `%`, `/` and `_` inside the bucket and
/// key are percent-encoded so the key is unambiguous; `dir` and `dir/` get
/// different keys.
///
/// ```
/// use bucketfs_core::{AttributeKind, BucketPath, cache::cache_key};
///
/// let path = BucketPath::parse("/photos/2024/beach.jpg")?;
/// assert_eq!(cache_key(&path, AttributeKind::Basic), "photos_2024%2Fbeach.jpg_basic");
/// # Ok::<(), bucketfs_core::FsError>(())
/// ```
pub fn cache_key(path: &BucketPath, kind: AttributeKind) -> String {
    format!(
        "{}_{}_{}",
        escape(path.bucket().unwrap_or_default()),
        escape(&path.key()),
        kind.tag()
    )
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '_' => out.push_str("%5F"),
            c => out.push(c),
        }
    }
    out
}

/// Shared attribute cache, one per filesystem instance.
pub struct AttributesCache {
    entries: moka::sync::Cache<String, CachedEntry>,
    ttl: Duration,
    stats: Arc<CacheStats>,
}

impl std::fmt::Debug for AttributesCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributesCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.entry_count())
            .finish_non_exhaustive()
    }
}

impl AttributesCache {
    /// Creates a cache holding at most `max_capacity` entries for `ttl` each.
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let stats = Arc::new(CacheStats::new());
        let stats_for_eviction = Arc::clone(&stats);
        let entries = moka::sync::Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(FixedExpiry)
            .eviction_listener(move |_key, _value, cause: RemovalCause| {
                if cause.was_evicted() {
                    stats_for_eviction.record_eviction();
                }
            })
            .build();
        Self {
            entries,
            ttl,
            stats,
        }
    }

    pub fn from_config(config: &FsConfig) -> Self {
        Self::new(config.cache_ttl, config.cache_capacity)
    }

    /// TTL given to every write.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached attributes for `path`, fetching on a miss.
    ///
    /// Returns `Ok(None)` when the path is confirmed absent, either from a
    /// negative entry or from a fetch. Fetch errors are returned as-is and
    /// leave the cache untouched.
    pub fn get<F>(
        &self,
        path: &BucketPath,
        kind: AttributeKind,
        fetcher: &F,
    ) -> FsResult<Option<AttributeSnapshot>>
    where
        F: AttributeFetcher + ?Sized,
    {
        let key = cache_key(path, kind);
        if let Some(entry) = self.entries.get(&key) {
            cache_event!(trace, key = %key, negative = entry.value.is_none(), "cache hit");
            self.stats.record_hit();
            return Ok(entry.value);
        }

        cache_event!(trace, key = %key, "cache miss");
        self.stats.record_miss();

        match fetcher.fetch(path, kind)? {
            Fetched::Stored(snapshot) => {
                self.put(path, Some(snapshot.clone()));
                Ok(Some(snapshot))
            }
            Fetched::Synthesized(snapshot) => Ok(Some(snapshot)),
            Fetched::Absent => {
                self.insert(key, None);
                Ok(None)
            }
        }
    }

    /// Cached entry without fetching.
    ///
    /// `None` if nothing is cached, `Some(None)` for a negative entry.
    pub fn get_if_present(
        &self,
        path: &BucketPath,
        kind: AttributeKind,
    ) -> Option<Option<AttributeSnapshot>> {
        let entry = self.entries.get(&cache_key(path, kind));
        if entry.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        entry.map(|e| e.value)
    }

    /// True if an entry (positive or negative) is cached. Not counted in stats.
    pub fn contains(&self, path: &BucketPath, kind: AttributeKind) -> bool {
        self.entries.contains_key(&cache_key(path, kind))
    }

    /// Records attributes for `path`.
    ///
    /// Always writes the basic entry. A POSIX snapshot also writes the POSIX
    /// entry. `None` writes a negative basic entry only; use
    /// [`put_absent`](Self::put_absent) to negatively cache a POSIX probe.
    pub fn put(&self, path: &BucketPath, snapshot: Option<AttributeSnapshot>) {
        let posix = snapshot
            .as_ref()
            .is_some_and(|s| s.kind == AttributeKind::PosixExtended);
        if posix {
            self.insert(
                cache_key(path, AttributeKind::PosixExtended),
                snapshot.clone(),
            );
        }
        self.insert(cache_key(path, AttributeKind::Basic), snapshot);
    }

    /// Records a freshly listed basic snapshot for `path`.
    ///
    /// A cached POSIX entry may describe an older version of the object, so
    /// it is dropped rather than left to expire.
    pub fn refresh_basic(&self, path: &BucketPath, snapshot: &AttributeSnapshot) {
        if self
            .entries
            .remove(&cache_key(path, AttributeKind::PosixExtended))
            .is_some()
        {
            self.stats.record_invalidation();
        }
        self.put(path, Some(snapshot.to_basic()));
    }

    /// Records that `path` is absent for `kind`.
    pub fn put_absent(&self, path: &BucketPath, kind: AttributeKind) {
        self.insert(cache_key(path, kind), None);
    }

    fn insert(&self, key: String, value: Option<AttributeSnapshot>) {
        cache_event!(trace, key = %key, negative = value.is_none(), "cache insert");
        self.stats.record_insert();
        self.entries.insert(
            key,
            CachedEntry {
                value,
                ttl: self.ttl,
            },
        );
    }

    /// Drops both views of `path` under both spellings (`dir` and `dir/`).
    pub fn invalidate(&self, path: &BucketPath) {
        let toggled = path.slash_toggled();
        for spelling in std::iter::once(path).chain(toggled.as_ref()) {
            for kind in AttributeKind::ALL {
                if self.entries.remove(&cache_key(spelling, kind)).is_some() {
                    self.stats.record_invalidation();
                }
            }
        }
        cache_event!(debug, path = %path, "cache invalidate");
    }

    /// Drops every entry.
    pub fn invalidate_all(&self) {
        debug!(entries = self.entries.entry_count(), "invalidating attribute cache");
        self.entries.invalidate_all();
    }

    /// Counters plus the current entry count.
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot(self.entries.entry_count())
    }

    /// Approximate entry count; exact after [`run_pending_tasks`](Self::run_pending_tasks).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Applies pending evictions and expirations now.
    pub fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks();
    }
}
