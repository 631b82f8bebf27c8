//! memora-http: typed REST requests with cache-through execution
//!
//! # Architecture
//!
//! - `RequestBuilder`: fluent accumulator producing immutable `RequestDescriptor`s
//! - `Transport`: sends a descriptor; `ReqwestTransport` is the pooled default
//! - `RestClient`: executes descriptors, runs status observers, deserializes
//!   payloads by content type
//! - `CachingClient`: get-or-fetch-and-populate over a shared typed cache
//!
//! Fetch failures degrade to default values at the cache-through layer;
//! only builder arguments are reported as errors.

pub mod builder;
pub mod caching;
pub mod client;
pub mod config;
pub mod deserializer;
pub mod error;
pub mod observer;
pub mod request;
pub mod response;
pub mod transport;

pub use builder::RequestBuilder;
pub use caching::CachingClient;
pub use client::RestClient;
pub use config::{ClientConfig, DEFAULT_CACHE_TTL};
pub use deserializer::{Deserializer, DeserializerRegistry, JsonDeserializer, JSON_CONTENT_TYPES};
pub use error::{HttpError, HttpErrorCategory, HttpResult};
pub use observer::{ResponseObserver, TracingObserver};
pub use request::{FileAttachment, Parameter, ParameterKind, RequestBody, RequestDescriptor};
pub use response::{ResponseStatus, RestResponse, RestResponseBuilder, TypedResponse};
pub use transport::{ReqwestTransport, Transport};

// Re-export shared types
pub use memora_cache::{CacheStore, MemoryCache, TypedCache};
pub use memora_common::http::{DataFormat, HttpMethod, HttpResponseLike, HttpStatus};
