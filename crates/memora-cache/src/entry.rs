//! Cache entry with expiry metadata

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Type-erased cached value
pub type CacheValue = Arc<dyn Any + Send + Sync>;

/// A stored value together with its expiry deadline
#[derive(Clone)]
pub struct CacheEntry {
    value: CacheValue,
    /// Name of the stored type, for diagnostics only
    type_name: &'static str,
    /// `None` when the TTL is too large to represent as an `Instant`
    expires_at: Option<Instant>,
}

impl CacheEntry {
    /// Create an entry that expires `ttl` from now
    pub fn new<T: Any + Send + Sync>(value: T, ttl: Duration) -> Self {
        Self {
            value: Arc::new(value),
            type_name: type_name::<T>(),
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    /// The type-erased value
    pub fn value(&self) -> &CacheValue {
        &self.value
    }

    /// Type name recorded at insertion
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the entry is past its deadline at `now`
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }

    /// Whether the entry is past its deadline
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Time left before expiry, zero if already expired
    pub fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires_at| expires_at.saturating_duration_since(Instant::now()))
    }

    /// Clone the value out if it was stored as `T`
    pub fn downcast<T: Any + Clone>(&self) -> Option<T> {
        self.value.downcast_ref::<T>().cloned()
    }

    /// Whether the value was stored as `T`
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("type_name", &self.type_name)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
