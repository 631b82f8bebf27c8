//! Common types for memora
//!
//! Shared HTTP vocabulary used by the cache and client crates.

pub mod http;

pub use http::{DataFormat, HttpMethod, HttpResponseLike, HttpStatus};
