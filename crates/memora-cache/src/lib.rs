//! memora-cache: in-process typed cache with per-entry expiry
//!
//! # Features
//! - Type-erased storage with a runtime type check on retrieval
//! - Type mismatches and expired entries degrade to a miss, never an error
//! - Sharded concurrent map, no global lock across keys
//! - Passive expiry on read plus an optional sweep
//!
//! Nothing is persisted; entries vanish with the process.

pub mod entry;
pub mod memory;
pub mod store;

pub use entry::{CacheEntry, CacheValue};
pub use memory::{CacheStats, MemoryCache};
pub use store::{CacheStore, TypedCache};
