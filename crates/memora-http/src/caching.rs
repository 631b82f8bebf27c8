//! Cache-through execution
//!
//! [`CachingClient`] consults the shared cache before touching the network
//! and stores successful typed results under a caller-chosen key. Failures
//! are never cached, so the next call for the same key tries again.
//!
//! Concurrent misses for one key are not coalesced: each may execute the
//! transport call, and the first successful result to be stored wins.

use memora_cache::{CacheStore, MemoryCache, TypedCache};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::client::RestClient;
use crate::request::RequestDescriptor;

/// [`RestClient`] decorated with a typed cache
#[derive(Clone)]
pub struct CachingClient {
    client: RestClient,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl CachingClient {
    /// Wrap `client`; entries live for the client's configured `cache_ttl`
    pub fn new(client: RestClient, cache: Arc<dyn CacheStore>) -> Self {
        let ttl = client.config().cache_ttl;
        Self { client, cache, ttl }
    }

    /// Wrap `client` around the process-wide [`MemoryCache`]
    pub fn with_global_cache(client: RestClient) -> Self {
        Self::new(client, MemoryCache::global())
    }

    /// Override the entry lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value under `key`, or fetch, store on `200 OK`, and return it.
    ///
    /// Returns `T::default()` when the fetch fails; nothing is cached then.
    pub async fn fetch_with_cache<T>(&self, request: &RequestDescriptor, key: &str) -> T
    where
        T: DeserializeOwned + Clone + Default + Send + Sync + 'static,
    {
        self.fetch_with_cache_for(request, key, self.ttl).await
    }

    /// [`Self::fetch_with_cache`] with an explicit TTL for a stored result
    pub async fn fetch_with_cache_for<T>(
        &self,
        request: &RequestDescriptor,
        key: &str,
        ttl: Duration,
    ) -> T
    where
        T: DeserializeOwned + Clone + Default + Send + Sync + 'static,
    {
        if let Some(cached) = self.cache.get::<T>(key) {
            tracing::trace!(key = %key, "Cache hit");
            return cached;
        }

        tracing::debug!(key = %key, request = %request, "Cache miss, fetching");
        let typed = self.client.execute_as::<T>(request).await;

        if typed.response.is_ok() {
            if let Some(data) = typed.data {
                self.cache.set_for(key, data.clone(), ttl);
                return data;
            }
        }

        tracing::debug!(
            key = %key,
            status = typed.response.status_code,
            deserialization_error = typed.deserialization_error.as_deref().unwrap_or(""),
            "Fetch failed, returning default"
        );
        T::default()
    }

    /// Typed read that bypasses the cache
    pub async fn get<T: DeserializeOwned + Default>(&self, request: &RequestDescriptor) -> T {
        self.client.get(request).await
    }

    /// Drop whatever is cached under `key`
    pub fn invalidate(&self, key: &str) -> bool {
        self.cache.remove(key)
    }
}

impl std::fmt::Debug for CachingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingClient")
            .field("client", &self.client)
            .field("cached_entries", &self.cache.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
