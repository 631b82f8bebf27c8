//! Transport boundary and the reqwest implementation

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::multipart;
use std::path::Path;
use std::time::Instant;

use crate::config::ClientConfig;
use crate::error::{HttpError, HttpResult};
use crate::request::{HttpMethod, ParameterKind, RequestBody, RequestDescriptor};
use crate::response::{from_reqwest, RestResponse};

/// Sends a descriptor and returns whatever came back
///
/// Implementations never fail: faults and timeouts are reported as a
/// response with status `0`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &RequestDescriptor) -> RestResponse;
}

/// Convert HttpMethod to reqwest Method
fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Options => reqwest::Method::OPTIONS,
    }
}

/// Connection-pooled transport over `reqwest`
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl ReqwestTransport {
    /// Build the underlying client from `config`
    pub fn new(config: &ClientConfig) -> HttpResult<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .user_agent(&config.user_agent);

        if config.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        } else {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        builder = builder.gzip(config.gzip).brotli(config.brotli);

        if config.danger_accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.clone(),
        })
    }

    /// Wrap an already configured client
    pub fn with_client(client: reqwest::Client, base_url: Option<String>) -> Self {
        Self { client, base_url }
    }

    /// Full URL for a descriptor: base URL joined with the expanded resource
    pub fn resolve_url(&self, request: &RequestDescriptor) -> String {
        let resource = request.expanded_resource();
        match self.base_url.as_deref() {
            Some(base) if !is_absolute(&resource) => {
                let base = base.trim_end_matches('/');
                let path = resource.trim_start_matches('/');
                if path.is_empty() {
                    base.to_string()
                } else {
                    format!("{}/{}", base, path)
                }
            }
            _ => resource,
        }
    }

    /// Build the reqwest request for a descriptor
    async fn build_request(
        &self,
        request: &RequestDescriptor,
        url: &str,
    ) -> HttpResult<reqwest::RequestBuilder> {
        let url = url::Url::parse(url)?;
        let mut builder = self.client.request(to_reqwest_method(request.method()), url);

        let mut headers = merged_headers(request);
        if let Some(accept) = request.format().content_type() {
            headers
                .entry("accept".to_string())
                .or_insert_with(|| ("Accept".to_string(), accept.to_string()));
        }
        let explicit_cookie = headers.shift_remove("cookie").map(|(_, value)| value);
        if let Some(cookie) = cookie_header(request, explicit_cookie) {
            headers.insert("cookie".to_string(), ("Cookie".to_string(), cookie));
        }
        for (name, value) in headers.values() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let has_files = request.file().is_some()
            || request.parameters_of(ParameterKind::File).next().is_some();

        // Body parameters ride in the query string next to an explicit body
        let body_params_in_query = !has_files && request.body().is_some();
        let query: Vec<(&str, &str)> = request
            .parameters()
            .iter()
            .filter(|p| {
                p.kind == ParameterKind::Query
                    || (body_params_in_query && p.kind == ParameterKind::Body)
            })
            .map(|p| (p.name.as_str(), p.value.as_str()))
            .collect();
        if !query.is_empty() {
            builder = builder.query(&query);
        }

        builder = if has_files {
            builder.multipart(build_multipart(request).await?)
        } else {
            match request.body() {
                Some(RequestBody::Json(value)) => builder.json(value),
                Some(RequestBody::Text { content_type, text }) => builder
                    .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                    .body(text.clone()),
                Some(RequestBody::Bytes {
                    content_type,
                    bytes,
                }) => builder
                    .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                    .body(bytes.clone()),
                None => {
                    let form: Vec<(&str, &str)> = request
                        .parameters_of(ParameterKind::Body)
                        .map(|p| (p.name.as_str(), p.value.as_str()))
                        .collect();
                    if form.is_empty() {
                        builder
                    } else {
                        builder.form(&form)
                    }
                }
            }
        };

        if let Some(timeout) = request.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(builder)
    }

    async fn send(
        &self,
        request: &RequestDescriptor,
        url: &str,
        start: Instant,
    ) -> HttpResult<RestResponse> {
        let builder = self.build_request(request, url).await?;
        let response = builder.send().await.map_err(classify_reqwest_error)?;
        let latency_ms = start.elapsed().as_millis() as u64;
        from_reqwest(response, latency_ms)
            .await
            .map_err(|e| match e {
                HttpError::Reqwest(inner) => classify_reqwest_error(inner),
                other => other,
            })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &RequestDescriptor) -> RestResponse {
        let start = Instant::now();
        let url = self.resolve_url(request);

        match self.send(request, &url, start).await {
            Ok(response) => response,
            Err(err) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                tracing::debug!(
                    method = %request.method(),
                    url = %url,
                    category = ?err.category(),
                    error = %err.sanitized_message(),
                    "Transport call failed"
                );
                RestResponse::failed(url, &err, latency_ms)
            }
        }
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn is_absolute(resource: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        resource
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Header parameters then builder headers, one entry per lowercase name.
/// A later entry with the same name wins.
fn merged_headers(request: &RequestDescriptor) -> IndexMap<String, (String, String)> {
    let mut headers = IndexMap::new();
    let sources = request
        .parameters_of(ParameterKind::Header)
        .map(|p| (p.name.as_str(), p.value.as_str()))
        .chain(request.headers().iter().map(|(k, v)| (k.as_str(), v.as_str())));
    for (name, value) in sources {
        headers.insert(
            name.to_ascii_lowercase(),
            (name.to_string(), value.to_string()),
        );
    }
    headers
}

/// One `Cookie` value: an explicit header first, then cookie parameters,
/// then builder cookies
fn cookie_header(request: &RequestDescriptor, explicit: Option<String>) -> Option<String> {
    let pairs = request
        .parameters_of(ParameterKind::Cookie)
        .map(|p| (p.name.as_str(), p.value.as_str()))
        .chain(request.cookies().iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .map(|(name, value)| format!("{}={}", name, value));
    let parts: Vec<String> = explicit.into_iter().chain(pairs).collect();
    (!parts.is_empty()).then(|| parts.join("; "))
}

/// Map reqwest failures onto timeout/connection variants
fn classify_reqwest_error(err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout(err.to_string())
    } else if err.is_connect() {
        HttpError::Connection(err.to_string())
    } else {
        HttpError::Reqwest(err)
    }
}

/// Multipart form with the attachment, `File` parameters, and `Body` fields
async fn build_multipart(request: &RequestDescriptor) -> HttpResult<multipart::Form> {
    let mut form = multipart::Form::new();

    for parameter in request.parameters_of(ParameterKind::Body) {
        form = form.text(parameter.name.clone(), parameter.value.clone());
    }
    for parameter in request.parameters_of(ParameterKind::File) {
        form = form.part(parameter.name.clone(), file_part(&parameter.value, None).await?);
    }
    if let Some(file) = request.file() {
        form = form.part(
            file.name.clone(),
            file_part(&file.path, file.content_type.as_deref()).await?,
        );
    }

    Ok(form)
}

async fn file_part(path: &str, content_type: Option<&str>) -> HttpResult<multipart::Part> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());

    let part = multipart::Part::bytes(bytes).file_name(file_name);
    match content_type {
        Some(mime) => part
            .mime_str(mime)
            .map_err(|e| HttpError::InvalidRequest(format!("Invalid content type '{}': {}", mime, e))),
        None => Ok(part),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RequestBuilder;
    use crate::request::{DataFormat, Parameter};

    fn transport(base_url: Option<&str>) -> ReqwestTransport {
        let mut config = ClientConfig::new();
        config.base_url = base_url.map(str::to_string);
        ReqwestTransport::new(&config).unwrap()
    }

    #[test]
    fn test_resolve_url_joins_base() {
        let transport = transport(Some("https://jsonplaceholder.typicode.com/"));
        let mut builder = RequestBuilder::new("/posts/{id}").unwrap();
        builder.add_parameter(Parameter::url_segment("id", "1"));

        assert_eq!(
            transport.resolve_url(&builder.create()),
            "https://jsonplaceholder.typicode.com/posts/1"
        );
    }

    #[test]
    fn test_resolve_url_keeps_absolute_resource() {
        let transport = transport(Some("https://api.example.com"));
        let request = RequestBuilder::new("https://other.example.com/users/1")
            .unwrap()
            .create();

        assert_eq!(
            transport.resolve_url(&request),
            "https://other.example.com/users/1"
        );
    }

    #[test]
    fn test_resolve_url_scheme_is_case_insensitive() {
        let transport = transport(Some("https://api.example.com"));
        let request = RequestBuilder::new("HTTPS://Other.example.com/users/1")
            .unwrap()
            .create();

        assert_eq!(
            transport.resolve_url(&request),
            "HTTPS://Other.example.com/users/1"
        );
        assert!(is_absolute("Http://x"));
        assert!(!is_absolute("httpx://x"));
        assert!(!is_absolute("ht"));
    }

    async fn built(request: &RequestDescriptor) -> reqwest::Request {
        let transport = transport(Some("https://api.example.com"));
        let url = transport.resolve_url(request);
        transport
            .build_request(request, &url)
            .await
            .unwrap()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_accept_header_from_parameter_replaces_default() {
        let mut builder = RequestBuilder::new("posts").unwrap();
        builder
            .set_format(DataFormat::Xml)
            .add_parameter(Parameter::header("Accept", "text/plain"));

        let request = built(&builder.create()).await;
        let accept: Vec<_> = request.headers().get_all("accept").iter().collect();
        assert_eq!(accept, vec!["text/plain"]);
    }

    #[tokio::test]
    async fn test_builder_header_overrides_header_parameter() {
        let mut builder = RequestBuilder::new("posts").unwrap();
        builder.add_parameter(Parameter::header("X-Trace", "from-param"));
        builder.add_header("x-trace", "from-builder").unwrap();

        let request = built(&builder.create()).await;
        let trace: Vec<_> = request.headers().get_all("x-trace").iter().collect();
        assert_eq!(trace, vec!["from-builder"]);
        assert_eq!(request.headers().get("accept").unwrap(), "application/json");
    }

    #[tokio::test]
    async fn test_cookies_folded_into_one_header() {
        let mut builder = RequestBuilder::new("posts").unwrap();
        builder
            .add_parameter(Parameter::header("Cookie", "sid=1"))
            .add_parameter(Parameter::cookie("theme", "dark"));
        builder.add_cookie("lang", "en").unwrap();

        let request = built(&builder.create()).await;
        let cookies: Vec<_> = request.headers().get_all("cookie").iter().collect();
        assert_eq!(cookies, vec!["sid=1; theme=dark; lang=en"]);
    }

    #[tokio::test]
    async fn test_body_parameters_move_to_query_next_to_body() {
        let mut builder = RequestBuilder::with_method("posts", HttpMethod::Post).unwrap();
        builder
            .add_body(&serde_json::json!({"title": "t"}))
            .unwrap()
            .add_parameter(Parameter::query("page", "1"))
            .add_parameter(Parameter::body("draft", "true"));

        let request = built(&builder.create()).await;
        assert_eq!(request.url().query(), Some("page=1&draft=true"));
        assert_eq!(
            request.body().and_then(|b| b.as_bytes()),
            Some(br#"{"title":"t"}"#.as_slice())
        );
    }

    #[tokio::test]
    async fn test_object_body_is_json_whatever_the_format() {
        let mut builder = RequestBuilder::with_method("posts", HttpMethod::Post).unwrap();
        builder
            .set_format(DataFormat::Xml)
            .add_body(&serde_json::json!({"title": "t"}))
            .unwrap();

        let request = built(&builder.create()).await;
        assert_eq!(request.headers().get("accept").unwrap(), "application/xml");
        assert_eq!(
            request.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_resolve_url_without_base() {
        let transport = transport(None);
        let request = RequestBuilder::new("https://api.example.com/x").unwrap().create();
        assert_eq!(transport.resolve_url(&request), "https://api.example.com/x");
    }

    #[tokio::test]
    async fn test_relative_url_without_base_is_status_zero() {
        let transport = transport(None);
        let request = RequestBuilder::new("posts/1").unwrap().create();

        let response = transport.execute(&request).await;
        assert_eq!(response.status_code, 0);
        assert!(response.error_message.is_some());
    }

    #[tokio::test]
    async fn test_missing_attachment_is_status_zero() {
        let transport = transport(Some("http://127.0.0.1:9"));
        let mut builder = RequestBuilder::with_method("upload", HttpMethod::Post).unwrap();
        builder
            .add_file("file", "/definitely/not/here.bin", None)
            .unwrap();

        let response = transport.execute(&builder.create()).await;
        assert_eq!(response.status_code, 0);
        assert!(!response.is_timeout());
    }
}
