//! Shared plan cache
//!
//! Maps [`CacheKey`] to a compiled value (a command definition) shared via
//! `Arc`. The cache is safe for concurrent use from any number of threads.
//!
//! # Design
//!
//! - DashMap: sharded map, lookups only lock the target shard
//! - Entry API: insert-or-fetch is atomic, so two threads racing to add the
//!   same key both end up with the single cached value
//! - Recency: a global tick stamped on every hit and insert
//! - Eviction: after an insert pushes the size above `capacity`, the least
//!   recently used entries are removed under a sweep lock
//!
//! Eviction is approximate under contention (an entry touched during a sweep
//! may still be chosen), never incorrect: an evicted key is a plain miss.

use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::key::CacheKey;

/// Default maximum number of entries
pub const DEFAULT_CAPACITY: usize = 1000;

type FxBuildHasher = BuildHasherDefault<FxHasher>;

struct CacheEntry<V> {
    value: Arc<V>,
    last_used: AtomicU64,
}

impl<V> CacheEntry<V> {
    fn new(value: Arc<V>, tick: u64) -> Self {
        Self {
            value,
            last_used: AtomicU64::new(tick),
        }
    }

    #[inline]
    fn touch(&self, tick: u64) {
        self.last_used.fetch_max(tick, Ordering::Relaxed);
    }
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups that found an entry
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Values inserted by `try_lookup_and_add`
    pub inserts: u64,
    /// `try_lookup_and_add` calls that returned an already cached value
    pub adoptions: u64,
    /// Entries removed to respect capacity
    pub evictions: u64,
    /// Current number of entries
    pub size: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit (0.0 with no lookups)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded, thread-safe map from cache key to shared compiled value
pub struct PlanCache<V> {
    entries: DashMap<CacheKey, CacheEntry<V>, FxBuildHasher>,
    capacity: usize,
    tick: AtomicU64,
    sweep: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    adoptions: AtomicU64,
    evictions: AtomicU64,
}

impl<V> PlanCache<V> {
    /// Create a cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_hasher(FxBuildHasher::default()),
            capacity: capacity.max(1),
            tick: AtomicU64::new(0),
            sweep: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            adoptions: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the cached value for `key`, if present
    pub fn try_lookup(&self, key: &CacheKey) -> Option<Arc<V>> {
        match self.entries.get(key) {
            Some(entry) => {
                entry.touch(self.next_tick());
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(target: "quarry::cache", text = key.text(), "plan cache hit");
                Some(Arc::clone(&entry.value))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(target: "quarry::cache", text = key.text(), "plan cache miss");
                None
            }
        }
    }

    /// Insert `value` under `key` unless an entry already exists
    ///
    /// Returns the value now cached for `key`: the existing one when another
    /// caller added it first, otherwise `value` itself.
    pub fn try_lookup_and_add(&self, key: CacheKey, value: Arc<V>) -> Arc<V> {
        let tick = self.next_tick();
        let (cached, inserted) = match self.entries.entry(key) {
            Entry::Occupied(occupied) => {
                let entry = occupied.get();
                entry.touch(tick);
                self.adoptions.fetch_add(1, Ordering::Relaxed);
                debug!(
                    target: "quarry::cache",
                    text = occupied.key().text(),
                    "plan cache adopted existing definition"
                );
                (Arc::clone(&entry.value), false)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(Arc::clone(&value), tick));
                self.inserts.fetch_add(1, Ordering::Relaxed);
                (value, true)
            }
        };

        if inserted && self.entries.len() > self.capacity {
            self.evict_to_capacity();
        }
        cached
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry (counters are kept)
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Counter snapshot
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            adoptions: self.adoptions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.entries.len(),
        }
    }

    #[inline]
    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn evict_to_capacity(&self) {
        let _sweep = self.sweep.lock();
        let len = self.entries.len();
        if len <= self.capacity {
            return;
        }

        let mut by_age: Vec<(u64, CacheKey)> = self
            .entries
            .iter()
            .map(|e| (e.value().last_used.load(Ordering::Relaxed), e.key().clone()))
            .collect();
        by_age.sort_unstable_by_key(|(tick, _)| *tick);

        let excess = len - self.capacity;
        let mut removed = 0u64;
        for (_, key) in by_age.into_iter().take(excess) {
            if self.entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        self.evictions.fetch_add(removed, Ordering::Relaxed);
        debug!(target: "quarry::cache", evicted = removed, "plan cache evicted entries");
    }
}

impl<V> Default for PlanCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<V> std::fmt::Debug for PlanCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanCache")
            .field("capacity", &self.capacity)
            .field("len", &self.entries.len())
            .finish()
    }
}
