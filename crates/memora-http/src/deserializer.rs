//! Pluggable payload deserializers keyed by content type

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{HttpError, HttpResult};
use crate::response::normalize_media_type;

/// Content types handled by the JSON deserializer out of the box
pub const JSON_CONTENT_TYPES: [&str; 3] = ["application/json", "text/json", "text/x-json"];

/// Turns a raw payload into an intermediate JSON value
///
/// Typed conversion happens afterwards with `serde_json::from_value`, which
/// keeps this trait object-safe.
pub trait Deserializer: Send + Sync {
    fn deserialize(&self, payload: &[u8]) -> HttpResult<serde_json::Value>;
}

/// `serde_json` backed deserializer
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDeserializer;

impl Deserializer for JsonDeserializer {
    fn deserialize(&self, payload: &[u8]) -> HttpResult<serde_json::Value> {
        serde_json::from_slice(payload)
            .map_err(|e| HttpError::Deserialization(format!("Invalid JSON payload: {}", e)))
    }
}

/// Content type to deserializer map
#[derive(Clone, Default)]
pub struct DeserializerRegistry {
    handlers: HashMap<String, Arc<dyn Deserializer>>,
}

impl DeserializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `deserializer` installed for the JSON content-type family
    pub fn with_json(deserializer: Arc<dyn Deserializer>) -> Self {
        let mut registry = Self::new();
        for content_type in JSON_CONTENT_TYPES {
            registry.add_handler(content_type, Arc::clone(&deserializer));
        }
        registry
    }

    /// Register or replace the handler for a content type
    pub fn add_handler(&mut self, content_type: &str, deserializer: Arc<dyn Deserializer>) {
        self.handlers
            .insert(normalize_media_type(content_type), deserializer);
    }

    pub fn remove_handler(&mut self, content_type: &str) {
        self.handlers.remove(&normalize_media_type(content_type));
    }

    /// Handler for a content type, accepting `+json` structured suffixes
    pub fn handler_for(&self, content_type: &str) -> Option<&Arc<dyn Deserializer>> {
        let media_type = normalize_media_type(content_type);
        self.handlers.get(&media_type).or_else(|| {
            media_type
                .ends_with("+json")
                .then(|| self.handlers.get("application/json"))
                .flatten()
        })
    }

    /// Deserialize `payload` into `T` with the handler for `content_type`
    pub fn deserialize<T: DeserializeOwned>(
        &self,
        content_type: &str,
        payload: &[u8],
    ) -> HttpResult<T> {
        let handler = self.handler_for(content_type).ok_or_else(|| {
            HttpError::Deserialization(format!(
                "No deserializer registered for content type '{}'",
                content_type
            ))
        })?;

        let value = handler.deserialize(payload)?;
        serde_json::from_value(value).map_err(|e| {
            HttpError::Deserialization(format!(
                "Failed to deserialize into {}: {}",
                std::any::type_name::<T>(),
                e
            ))
        })
    }

    pub fn content_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl fmt::Debug for DeserializerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeserializerRegistry")
            .field("content_types", &self.content_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct UserModel {
        id: u32,
        username: String,
    }

    fn registry() -> DeserializerRegistry {
        DeserializerRegistry::with_json(Arc::new(JsonDeserializer))
    }

    #[test]
    fn test_json_family_registered() {
        assert_eq!(
            registry().content_types(),
            vec!["application/json", "text/json", "text/x-json"]
        );
    }

    #[test]
    fn test_deserialize_typed() {
        let user: UserModel = registry()
            .deserialize(
                "application/json; charset=utf-8",
                br#"{"id": 1, "username": "Bret"}"#,
            )
            .unwrap();

        assert_eq!(
            user,
            UserModel {
                id: 1,
                username: "Bret".to_string()
            }
        );
    }

    #[test]
    fn test_text_json_variants() {
        let registry = registry();
        let a: Vec<u32> = registry.deserialize("text/json", b"[1,2]").unwrap();
        let b: Vec<u32> = registry.deserialize("TEXT/X-JSON", b"[3]").unwrap();
        assert_eq!(a, vec![1, 2]);
        assert_eq!(b, vec![3]);
    }

    #[test]
    fn test_structured_json_suffix_falls_back() {
        let value: serde_json::Value = registry()
            .deserialize("application/problem+json", br#"{"title": "x"}"#)
            .unwrap();
        assert_eq!(value["title"], "x");
    }

    #[test]
    fn test_unregistered_content_type() {
        let err = registry()
            .deserialize::<UserModel>("text/html", b"<html></html>")
            .unwrap_err();
        assert!(matches!(err, HttpError::Deserialization(_)));
    }

    #[test]
    fn test_shape_mismatch_is_deserialization_error() {
        let err = registry()
            .deserialize::<UserModel>("application/json", br#"{"id": "not a number"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("UserModel"));
    }

    #[test]
    fn test_remove_handler() {
        let mut registry = registry();
        registry.remove_handler("text/json");
        assert!(registry.handler_for("text/json").is_none());
        assert!(registry.handler_for("application/json").is_some());
    }
}
