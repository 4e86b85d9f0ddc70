//! In-memory read-through caching.
//!
//! [`TtlCache`] is a plain owned value: whoever needs a cache creates one
//! and passes it where it is used. Entries expire after a fixed TTL and can
//! be invalidated one at a time or by predicate. All time-dependent methods
//! have an `_at` variant taking the current [`Instant`] for testing.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tracing::trace;

/// Default cache TTL in minutes.
pub const DEFAULT_CACHE_TTL_MINUTES: u32 = 5;

/// Where a piece of data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Freshly fetched from the API.
    Fresh,
    /// Served from cache (still valid).
    FromCache,
}

impl CacheStatus {
    /// Get the display icon for the cache status.
    pub fn icon(&self) -> &'static str {
        match self {
            CacheStatus::Fresh => "●",
            CacheStatus::FromCache => "○",
        }
    }

    /// Get the display text for the cache status.
    pub fn text(&self) -> &'static str {
        match self {
            CacheStatus::Fresh => "Live",
            CacheStatus::FromCache => "Cached",
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, CacheStatus::FromCache)
    }
}

/// A cached value with its insertion time.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub cached_at: Instant,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, ttl: Duration, now: Instant) -> Self {
        Self {
            data,
            cached_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.cached_at)
    }
}

/// Key/value cache with a fixed time-to-live.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// A clone of the value under `key` if present and not expired. Expired
    /// entries are dropped.
    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                trace!(age_ms = entry.age(now).as_millis() as u64, "Cache hit");
                Some(entry.data.clone())
            }
            Some(_) => {
                trace!("Cache entry expired");
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&mut self, key: K, value: V, now: Instant) {
        self.entries.insert(key, CacheEntry::new(value, self.ttl, now));
    }

    /// Remove one entry. Returns whether it was present.
    pub fn invalidate(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove every entry whose key matches `predicate`. Returns the number
    /// removed.
    pub fn invalidate_where(&mut self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !predicate(k));
        before - self.entries.len()
    }

    /// Drop expired entries.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
