//! Cache storage traits
//!
//! `CacheStore` is the object-safe storage seam. `TypedCache` layers the typed
//! get/set API on top of every store, so `Arc<dyn CacheStore>` gets it too.

use std::any::Any;
use std::time::Duration;

use crate::entry::CacheEntry;

/// Trait for cache storage backends
pub trait CacheStore: Send + Sync {
    /// Get a live entry. Expired entries are never returned.
    fn get_entry(&self, key: &str) -> Option<CacheEntry>;

    /// Add an entry unless a live one already exists under `key`.
    /// Returns whether the entry was stored.
    fn insert_entry(&self, key: &str, entry: CacheEntry) -> bool;

    /// Store an entry, overwriting whatever is under `key`
    fn replace_entry(&self, key: &str, entry: CacheEntry);

    /// Remove an entry. Returns whether anything was removed.
    fn remove(&self, key: &str) -> bool;

    /// Number of stored entries (including expired ones not yet dropped)
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all expired entries. Returns the number removed.
    fn purge_expired(&self) -> usize;

    /// Drop everything
    fn clear(&self);
}

/// Typed access over any [`CacheStore`]
pub trait TypedCache: CacheStore {
    /// Get the value under `key` as `T`.
    ///
    /// Returns `None` when the key is absent, expired, or holds another type.
    fn get<T: Any + Clone + Send + Sync>(&self, key: &str) -> Option<T> {
        let entry = self.get_entry(key)?;
        let value = entry.downcast::<T>();
        if value.is_none() {
            tracing::trace!(
                key = %key,
                stored = entry.type_name(),
                requested = std::any::type_name::<T>(),
                "Cache type mismatch"
            );
        }
        value
    }

    /// Store `value` for `ttl_minutes`. Absent values are never cached.
    fn set<T: Any + Send + Sync>(&self, key: &str, value: Option<T>, ttl_minutes: u64) -> bool {
        match value {
            Some(value) => {
                self.set_for(key, value, Duration::from_secs(ttl_minutes.saturating_mul(60)))
            }
            None => false,
        }
    }

    /// Store `value` for an arbitrary TTL, keeping a live entry if present
    fn set_for<T: Any + Send + Sync>(&self, key: &str, value: T, ttl: Duration) -> bool {
        self.insert_entry(key, CacheEntry::new(value, ttl))
    }

    /// Store `value`, overwriting any existing entry
    fn replace_for<T: Any + Send + Sync>(&self, key: &str, value: T, ttl: Duration) {
        self.replace_entry(key, CacheEntry::new(value, ttl))
    }

    /// Whether a live entry of type `T` exists under `key`
    fn contains<T: Any>(&self, key: &str) -> bool {
        self.get_entry(key).is_some_and(|entry| entry.is::<T>())
    }
}

impl<S: CacheStore + ?Sized> TypedCache for S {}
