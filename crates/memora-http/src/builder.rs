//! Fluent request builder
//!
//! [`RequestBuilder`] accumulates everything about a call and materializes it
//! with [`RequestBuilder::create`]. The builder is a mutable accumulator: it
//! keeps its state after `create()` and can produce any number of
//! descriptors.
//!
//! ```ignore
//! use memora_http::{HttpMethod, Parameter, RequestBuilder};
//!
//! let mut builder = RequestBuilder::new("users/{id}")?;
//! let request = builder
//!     .set_method(HttpMethod::Get)
//!     .add_parameter(Parameter::url_segment("id", "1"))
//!     .add_header("X-Trace", "abc")?
//!     .set_timeout(5_000)?
//!     .create();
//! ```

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{HttpError, HttpResult};
use crate::request::{
    DataFormat, FileAttachment, HttpMethod, Parameter, RequestBody, RequestDescriptor,
};

/// Mutable accumulator producing [`RequestDescriptor`]s
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    resource: String,
    method: HttpMethod,
    format: DataFormat,
    headers: IndexMap<String, String>,
    cookies: IndexMap<String, String>,
    parameters: Vec<Parameter>,
    body: Option<RequestBody>,
    file: Option<FileAttachment>,
    timeout_ms: u64,
}

impl RequestBuilder {
    /// Create a builder for `resource` with `GET` and JSON defaults
    pub fn new(resource: impl Into<String>) -> HttpResult<Self> {
        Self::with_format(resource, HttpMethod::default(), DataFormat::default())
    }

    /// Create a builder with an explicit method
    pub fn with_method(resource: impl Into<String>, method: HttpMethod) -> HttpResult<Self> {
        Self::with_format(resource, method, DataFormat::default())
    }

    /// Create a builder with an explicit method and data format
    pub fn with_format(
        resource: impl Into<String>,
        method: HttpMethod,
        format: DataFormat,
    ) -> HttpResult<Self> {
        let resource = resource.into();
        if resource.is_empty() {
            return Err(HttpError::invalid_argument(
                "resource",
                "resource must not be empty",
            ));
        }

        Ok(Self {
            resource,
            method,
            format,
            headers: IndexMap::new(),
            cookies: IndexMap::new(),
            parameters: Vec::new(),
            body: None,
            file: None,
            timeout_ms: 0,
        })
    }

    /// Create a builder from an absolute URL
    pub fn from_url(url: &url::Url) -> HttpResult<Self> {
        Self::new(url.as_str())
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    pub fn cookie_count(&self) -> usize {
        self.cookies.len()
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Add a header, overwriting an existing one only if the value differs
    pub fn add_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> HttpResult<&mut Self> {
        merge_entry(&mut self.headers, "name", name.into(), value.into())?;
        Ok(self)
    }

    /// Add several headers with the same rule as [`Self::add_header`].
    ///
    /// Entries are merged one at a time; entries before a rejected one stay
    /// merged.
    pub fn add_headers<I, K, V>(&mut self, headers: I) -> HttpResult<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            merge_entry(&mut self.headers, "headers", name.into(), value.into())?;
        }
        Ok(self)
    }

    /// Add a cookie, overwriting an existing one only if the value differs
    pub fn add_cookie(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> HttpResult<&mut Self> {
        merge_entry(&mut self.cookies, "name", name.into(), value.into())?;
        Ok(self)
    }

    /// Add a parameter unless an equal one is already present
    pub fn add_parameter(&mut self, parameter: Parameter) -> &mut Self {
        if !self.parameters.contains(&parameter) {
            self.parameters.push(parameter);
        }
        self
    }

    /// Add parameters, replacing any existing parameter with the same name.
    ///
    /// A replaced parameter moves to the end, after the parameters that were
    /// already present.
    pub fn add_parameters<I>(&mut self, parameters: I) -> &mut Self
    where
        I: IntoIterator<Item = Parameter>,
    {
        for parameter in parameters {
            if let Some(pos) = self.parameters.iter().position(|p| p.name == parameter.name) {
                self.parameters.remove(pos);
            }
            self.parameters.push(parameter);
        }
        self
    }

    /// Remove a header by name; absent headers are ignored
    pub fn remove_header(&mut self, name: &str) -> HttpResult<&mut Self> {
        if name.is_empty() {
            return Err(HttpError::invalid_argument("name", "header name must not be empty"));
        }
        self.headers.shift_remove(name);
        Ok(self)
    }

    pub fn remove_headers(&mut self) -> &mut Self {
        self.headers.clear();
        self
    }

    pub fn remove_cookies(&mut self) -> &mut Self {
        self.cookies.clear();
        self
    }

    pub fn remove_parameters(&mut self) -> &mut Self {
        self.parameters.clear();
        self
    }

    /// Remove the first parameter whose name matches `parameter.name`
    pub fn remove_parameter(&mut self, parameter: &Parameter) -> &mut Self {
        if let Some(pos) = self.parameters.iter().position(|p| p.name == parameter.name) {
            self.parameters.remove(pos);
        }
        self
    }

    pub fn set_method(&mut self, method: HttpMethod) -> &mut Self {
        self.method = method;
        self
    }

    pub fn set_format(&mut self, format: DataFormat) -> &mut Self {
        self.format = format;
        self
    }

    /// Set the request timeout in milliseconds; `0` uses the client default
    pub fn set_timeout(&mut self, timeout_ms: i64) -> HttpResult<&mut Self> {
        if timeout_ms < 0 {
            return Err(HttpError::invalid_argument(
                "timeout",
                format!("must be >= 0, got {}", timeout_ms),
            ));
        }
        self.timeout_ms = timeout_ms as u64;
        Ok(self)
    }

    /// Set the body to a serialized object, replacing any previous body
    pub fn add_body<T: Serialize + ?Sized>(&mut self, body: &T) -> HttpResult<&mut Self> {
        let value = serde_json::to_value(body)?;
        if value.is_null() {
            return Err(HttpError::invalid_argument("body", "body must not be null"));
        }
        self.body = Some(RequestBody::Json(value));
        Ok(self)
    }

    /// Set a raw text body, replacing any previous body
    pub fn add_text_body(
        &mut self,
        content_type: impl Into<String>,
        text: impl Into<String>,
    ) -> HttpResult<&mut Self> {
        let text = text.into();
        if text.is_empty() {
            return Err(HttpError::invalid_argument("body", "body must not be empty"));
        }
        self.body = Some(RequestBody::Text {
            content_type: content_type.into(),
            text,
        });
        Ok(self)
    }

    /// Set a raw byte body, replacing any previous body
    pub fn add_bytes_body(
        &mut self,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> HttpResult<&mut Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(HttpError::invalid_argument("body", "body must not be empty"));
        }
        self.body = Some(RequestBody::Bytes {
            content_type: content_type.into(),
            bytes,
        });
        Ok(self)
    }

    /// Attach a file, replacing any previous attachment
    pub fn add_file(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
        content_type: Option<&str>,
    ) -> HttpResult<&mut Self> {
        let name = name.into();
        let path = path.into();
        if name.is_empty() {
            return Err(HttpError::invalid_argument("name", "file name must not be empty"));
        }
        if path.is_empty() {
            return Err(HttpError::invalid_argument("path", "file path must not be empty"));
        }

        self.file = Some(FileAttachment {
            name,
            path,
            content_type: content_type.map(str::to_string),
        });
        Ok(self)
    }

    /// Materialize the accumulated state. The builder is left untouched.
    pub fn create(&self) -> RequestDescriptor {
        RequestDescriptor {
            resource: self.resource.clone(),
            method: self.method,
            format: self.format,
            parameters: self.parameters.clone(),
            headers: self.headers.clone(),
            cookies: self.cookies.clone(),
            body: self.body.clone(),
            file: self.file.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}

/// Insert `name`, or overwrite it when the stored value differs
fn merge_entry(
    map: &mut IndexMap<String, String>,
    argument: &'static str,
    name: String,
    value: String,
) -> HttpResult<()> {
    if name.is_empty() {
        return Err(HttpError::invalid_argument(argument, "name must not be empty"));
    }

    match map.get_mut(&name) {
        Some(existing) => {
            if *existing != value {
                *existing = value;
            }
        }
        None => {
            map.insert(name, value);
        }
    }
    Ok(())
}
