//! In-memory cache backed by a sharded concurrent map

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::entry::CacheEntry;
use crate::store::CacheStore;

static GLOBAL: Lazy<Arc<MemoryCache>> = Lazy::new(|| Arc::new(MemoryCache::new()));

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found a live entry
    pub hits: u64,
    /// Lookups that found nothing or an expired entry
    pub misses: u64,
    /// Entries stored
    pub inserts: u64,
    /// Expired entries dropped, on read or by a sweep
    pub expirations: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    expirations: AtomicU64,
}

/// Thread-safe in-process cache
///
/// Writes follow add semantics: [`CacheStore::insert_entry`] keeps a live
/// entry and only replaces an absent or expired one.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    counters: Counters,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide shared instance
    pub fn global() -> Arc<MemoryCache> {
        Arc::clone(&GLOBAL)
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            inserts: self.counters.inserts.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
        }
    }

    /// Keys currently stored, live or not
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}

impl CacheStore for MemoryCache {
    fn get_entry(&self, key: &str) -> Option<CacheEntry> {
        let now = Instant::now();

        // The shard guard must be released before removing below.
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value().clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            // A concurrent writer may have replaced it with a fresh entry.
            if self
                .entries
                .remove_if(key, |_, entry| entry.is_expired_at(now))
                .is_some()
            {
                self.counters.expirations.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key = %key, "Cache entry expired");
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn insert_entry(&self, key: &str, entry: CacheEntry) -> bool {
        let stored = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(entry);
                    self.counters.expirations.fetch_add(1, Ordering::Relaxed);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                true
            }
        };

        if stored {
            self.counters.inserts.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key = %key, "Cache entry stored");
        } else {
            tracing::trace!(key = %key, "Cache entry kept, live entry already present");
        }
        stored
    }

    fn replace_entry(&self, key: &str, entry: CacheEntry) {
        self.entries.insert(key.to_string(), entry);
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0usize;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired_at(now);
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            self.counters
                .expirations
                .fetch_add(removed as u64, Ordering::Relaxed);
            tracing::debug!(removed, "Purged expired cache entries");
        }
        removed
    }

    fn clear(&self) {
        self.entries.clear();
    }
}
