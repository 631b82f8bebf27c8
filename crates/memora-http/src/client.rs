//! REST client executing request descriptors

use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::deserializer::{Deserializer, DeserializerRegistry, JsonDeserializer};
use crate::error::HttpResult;
use crate::observer::{ResponseObserver, TracingObserver};
use crate::request::RequestDescriptor;
use crate::response::{ResponseStatus, RestResponse, TypedResponse};
use crate::transport::{ReqwestTransport, Transport};

/// Executes [`RequestDescriptor`]s against a [`Transport`]
///
/// Every execution is followed by the registered [`ResponseObserver`]s.
/// Typed execution deserializes the payload with the deserializer registered
/// for the response content type.
///
/// # Example
///
/// ```ignore
/// use memora_http::{ClientConfig, RequestBuilder, RestClient};
///
/// let client = RestClient::new(ClientConfig::new().base_url("https://jsonplaceholder.typicode.com"))?;
/// let request = RequestBuilder::new("users/1")?.create();
/// let user: UserModel = client.get(&request).await;
/// ```
#[derive(Clone)]
pub struct RestClient {
    transport: Arc<dyn Transport>,
    deserializers: DeserializerRegistry,
    observers: Vec<Arc<dyn ResponseObserver>>,
    config: Arc<ClientConfig>,
}

impl RestClient {
    /// Client over reqwest with the JSON deserializer
    pub fn new(config: ClientConfig) -> HttpResult<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(
            config,
            Arc::new(transport),
            Arc::new(JsonDeserializer),
        ))
    }

    /// Client with a default configuration
    pub fn default_client() -> HttpResult<Self> {
        Self::new(ClientConfig::default())
    }

    /// Client over any transport; `deserializer` is registered for the JSON
    /// content-type family
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        deserializer: Arc<dyn Deserializer>,
    ) -> Self {
        Self {
            transport,
            deserializers: DeserializerRegistry::with_json(deserializer),
            observers: vec![Arc::new(TracingObserver)],
            config: Arc::new(config),
        }
    }

    /// Register or replace the deserializer for a content type
    pub fn add_handler(
        &mut self,
        content_type: &str,
        deserializer: Arc<dyn Deserializer>,
    ) -> &mut Self {
        self.deserializers.add_handler(content_type, deserializer);
        self
    }

    /// Add an observer run after every execution
    pub fn add_observer(&mut self, observer: Arc<dyn ResponseObserver>) -> &mut Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> Option<&str> {
        self.config.base_url.as_deref()
    }

    pub fn deserializers(&self) -> &DeserializerRegistry {
        &self.deserializers
    }

    /// Send a descriptor and return the raw response
    pub async fn execute(&self, request: &RequestDescriptor) -> RestResponse {
        let response = self.transport.execute(request).await;
        for observer in &self.observers {
            observer.observe(request, &response);
        }
        response
    }

    /// Send a descriptor and deserialize the payload into `T`
    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
    ) -> TypedResponse<T> {
        let response = self.execute(request).await;

        if response.response_status != ResponseStatus::Completed || response.body.is_empty() {
            return TypedResponse {
                response,
                data: None,
                deserialization_error: None,
            };
        }

        let content_type = response
            .media_type()
            .or_else(|| request.format().content_type().map(str::to_string))
            .unwrap_or_default();

        match self
            .deserializers
            .deserialize::<T>(&content_type, &response.body)
        {
            Ok(data) => TypedResponse {
                response,
                data: Some(data),
                deserialization_error: None,
            },
            Err(err) => {
                tracing::debug!(
                    url = %response.url,
                    content_type = %content_type,
                    error = %err,
                    "Response payload not deserialized"
                );
                TypedResponse {
                    response,
                    data: None,
                    deserialization_error: Some(err.to_string()),
                }
            }
        }
    }

    /// Typed read without caching: the payload on `200 OK`, otherwise
    /// `T::default()`
    pub async fn get<T: DeserializeOwned + Default>(&self, request: &RequestDescriptor) -> T {
        let typed = self.execute_as::<T>(request).await;
        if typed.response.is_ok() {
            typed.data.unwrap_or_default()
        } else {
            T::default()
        }
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .field("deserializers", &self.deserializers)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RequestBuilder;
    use crate::request::DataFormat;
    use crate::response::RestResponseBuilder;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::Mutex;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct UserModel {
        id: u32,
        username: String,
    }

    /// Replays one canned response
    struct StaticTransport {
        response: RestResponse,
    }

    #[async_trait]
    impl Transport for StaticTransport {
        async fn execute(&self, _request: &RequestDescriptor) -> RestResponse {
            self.response.clone()
        }
    }

    fn client(response: RestResponse) -> RestClient {
        RestClient::with_transport(
            ClientConfig::new().base_url("https://jsonplaceholder.typicode.com"),
            Arc::new(StaticTransport { response }),
            Arc::new(JsonDeserializer),
        )
    }

    fn request() -> RequestDescriptor {
        RequestBuilder::new("users/1").unwrap().create()
    }

    #[test]
    fn test_client_creation() {
        let client = RestClient::new(
            ClientConfig::new()
                .base_url("https://api.example.com")
                .timeout(std::time::Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url(), Some("https://api.example.com"));
        assert_eq!(
            client.deserializers().content_types(),
            vec!["application/json", "text/json", "text/x-json"]
        );
    }

    #[tokio::test]
    async fn test_execute_as_deserializes_json() {
        let client = client(
            RestResponseBuilder::new()
                .json(&serde_json::json!({"id": 1, "username": "Bret"}))
                .build(),
        );

        let typed = client.execute_as::<UserModel>(&request()).await;
        assert!(typed.is_ok());
        assert_eq!(typed.data.unwrap().username, "Bret");
    }

    #[tokio::test]
    async fn test_execute_as_falls_back_to_format_content_type() {
        let client = client(
            RestResponseBuilder::new()
                .body(r#"{"id": 2, "username": "Antonette"}"#)
                .build(),
        );

        let typed = client.execute_as::<UserModel>(&request()).await;
        assert_eq!(typed.data.unwrap().id, 2);

        let mut builder = RequestBuilder::new("users/1").unwrap();
        builder.set_format(DataFormat::Xml);
        let typed = client.execute_as::<UserModel>(&builder.create()).await;
        assert!(typed.data.is_none());
        assert!(typed.deserialization_error.is_some());
    }

    #[tokio::test]
    async fn test_execute_as_skips_payload_of_failed_call() {
        let client = client(
            RestResponseBuilder::new()
                .status_code(0)
                .url("https://jsonplaceholder.typicode.com/users/1")
                .response_status(ResponseStatus::TimedOut)
                .json(&serde_json::json!({"id": 1, "username": "Bret"}))
                .build(),
        );

        let typed = client.execute_as::<UserModel>(&request()).await;
        assert!(typed.response.is_timeout());
        assert_eq!(typed.response.url, "https://jsonplaceholder.typicode.com/users/1");
        assert!(typed.data.is_none());
        assert!(typed.deserialization_error.is_none());
    }

    #[tokio::test]
    async fn test_execute_as_unregistered_content_type() {
        let client = client(
            RestResponseBuilder::new()
                .header("Content-Type", "text/html")
                .body("<html></html>")
                .build(),
        );

        let typed = client.execute_as::<UserModel>(&request()).await;
        assert_eq!(typed.status().code(), 200);
        assert!(typed.data.is_none());
    }

    #[tokio::test]
    async fn test_add_handler_for_custom_content_type() {
        let mut client = client(
            RestResponseBuilder::new()
                .header("Content-Type", "application/vnd.users.v1")
                .body(r#"{"id": 3, "username": "Samantha"}"#)
                .build(),
        );
        client.add_handler("application/vnd.users.v1", Arc::new(JsonDeserializer));

        let user: UserModel = client.get(&request()).await;
        assert_eq!(user.id, 3);
    }

    #[tokio::test]
    async fn test_get_returns_default_on_failure() {
        let client = client(
            RestResponseBuilder::new()
                .status_code(500)
                .json(&serde_json::json!({"id": 9, "username": "x"}))
                .build(),
        );

        let user: UserModel = client.get(&request()).await;
        assert_eq!(user, UserModel::default());
    }

    #[tokio::test]
    async fn test_observers_see_every_response() {
        let seen: Arc<Mutex<Vec<(String, u16)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut client = client(RestResponseBuilder::new().status_code(0).build());
        client.add_observer(Arc::new(
            move |request: &RequestDescriptor, response: &RestResponse| {
                sink.lock()
                    .unwrap()
                    .push((request.resource().to_string(), response.status_code));
            },
        ));

        let response = client.execute(&request()).await;
        client.execute_as::<UserModel>(&request()).await;

        // The observer does not alter the result
        assert_eq!(response.status_code, 0);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("users/1".to_string(), 0), ("users/1".to_string(), 0)]
        );
    }
}
