//! Request parameters and the immutable request descriptor

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

pub use memora_common::http::{DataFormat, HttpMethod};

/// Where a parameter ends up when the request is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParameterKind {
    /// Request header
    Header,
    /// Cookie, folded into the `Cookie` header
    Cookie,
    /// Query-string pair
    Query,
    /// Form field (url-encoded, or a text part next to file attachments)
    Body,
    /// File part; the value is the path on disk
    File,
    /// Replaces a `{name}` placeholder in the resource
    UrlSegment,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterKind::Header => "header",
            ParameterKind::Cookie => "cookie",
            ParameterKind::Query => "query",
            ParameterKind::Body => "body",
            ParameterKind::File => "file",
            ParameterKind::UrlSegment => "url-segment",
        };
        f.write_str(name)
    }
}

/// A named request parameter
///
/// Equality covers name, value, and kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
    pub kind: ParameterKind,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
        }
    }

    pub fn query(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, ParameterKind::Query)
    }

    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, ParameterKind::Header)
    }

    pub fn cookie(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, ParameterKind::Cookie)
    }

    pub fn body(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, ParameterKind::Body)
    }

    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, path, ParameterKind::File)
    }

    pub fn url_segment(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, ParameterKind::UrlSegment)
    }
}

/// Request body payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized object, always sent as `application/json`
    Json(serde_json::Value),
    /// Raw text with an explicit content type
    Text { content_type: String, text: String },
    /// Raw bytes with an explicit content type
    Bytes { content_type: String, bytes: Vec<u8> },
}

impl RequestBody {
    /// Content type sent with this body
    pub fn content_type(&self) -> &str {
        match self {
            RequestBody::Json(_) => "application/json",
            RequestBody::Text { content_type, .. } | RequestBody::Bytes { content_type, .. } => {
                content_type
            }
        }
    }
}

/// Single file attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAttachment {
    /// Multipart field name
    pub name: String,
    /// Path on disk
    pub path: String,
    /// Explicit content type, guessed by the transport when absent
    pub content_type: Option<String>,
}

/// Immutable description of one HTTP call, produced by
/// [`crate::RequestBuilder::create`]
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub(crate) resource: String,
    pub(crate) method: HttpMethod,
    pub(crate) format: DataFormat,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) headers: IndexMap<String, String>,
    pub(crate) cookies: IndexMap<String, String>,
    pub(crate) body: Option<RequestBody>,
    pub(crate) file: Option<FileAttachment>,
    pub(crate) timeout_ms: u64,
}

impl RequestDescriptor {
    /// Resource path or absolute URL; never empty
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn format(&self) -> DataFormat {
        self.format
    }

    /// Parameters in insertion order
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Parameters of one kind, in insertion order
    pub fn parameters_of(&self, kind: ParameterKind) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(move |p| p.kind == kind)
    }

    /// Headers in insertion order
    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    /// Cookies in insertion order
    pub fn cookies(&self) -> &IndexMap<String, String> {
        &self.cookies
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn file(&self) -> Option<&FileAttachment> {
        self.file.as_ref()
    }

    /// Timeout in milliseconds; `0` defers to the client timeout
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Per-request timeout override, if any
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Resource with every `{name}` placeholder replaced by its
    /// percent-encoded url-segment value
    pub fn expanded_resource(&self) -> String {
        self.parameters_of(ParameterKind::UrlSegment)
            .fold(self.resource.clone(), |resource, segment| {
                resource.replace(
                    &format!("{{{}}}", segment.name),
                    &urlencoding::encode(&segment.value),
                )
            })
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.expanded_resource())
    }
}
