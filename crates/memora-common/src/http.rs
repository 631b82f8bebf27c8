//! Shared HTTP types for the memora crates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Returns the method as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(format!("Invalid HTTP method: {}", s)),
        }
    }
}

/// Serialization format of a request (body encoding and expected response).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataFormat {
    #[default]
    Json,
    Xml,
    /// No format negotiation; no `Accept` header is sent.
    None,
}

impl DataFormat {
    /// Default content type for this format, used for `Accept` and as the
    /// deserializer fallback when a response carries no content type.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Json => Some("application/json"),
            Self::Xml => Some("application/xml"),
            Self::None => None,
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// HTTP status code wrapper with helper methods.
///
/// Status `0` means no response was received (connection failure or timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HttpStatus(pub u16);

impl HttpStatus {
    pub const NONE: Self = Self(0);
    pub const OK: Self = Self(200);
    pub const CREATED: Self = Self(201);
    pub const NO_CONTENT: Self = Self(204);
    pub const BAD_REQUEST: Self = Self(400);
    pub const UNAUTHORIZED: Self = Self(401);
    pub const FORBIDDEN: Self = Self(403);
    pub const NOT_FOUND: Self = Self(404);
    pub const INTERNAL_SERVER_ERROR: Self = Self(500);
    pub const BAD_GATEWAY: Self = Self(502);
    pub const SERVICE_UNAVAILABLE: Self = Self(503);

    /// Returns the status code as u16.
    pub fn code(&self) -> u16 {
        self.0
    }

    /// Returns true if this is exactly `200 OK`.
    pub fn is_ok(&self) -> bool {
        *self == Self::OK
    }

    /// Returns true if no response status was received.
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if this is a success status (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// Returns true if this is a client error status (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }

    /// Returns true if this is a server error status (5xx).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }

    /// Returns true if this is a redirect status (3xx).
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.0)
    }
}

impl From<u16> for HttpStatus {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<HttpStatus> for u16 {
    fn from(status: HttpStatus) -> Self {
        status.0
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait for types that represent HTTP responses.
pub trait HttpResponseLike {
    /// Returns the HTTP status code.
    fn status_code(&self) -> u16;

    /// Returns the response headers. Keys are expected to be lowercase.
    fn headers(&self) -> &HashMap<String, String>;

    /// Returns the response body as bytes.
    fn body_bytes(&self) -> &[u8];

    /// Returns the HTTP status.
    fn status(&self) -> HttpStatus {
        HttpStatus(self.status_code())
    }

    /// Returns true if this is a success response (2xx).
    fn is_success(&self) -> bool {
        self.status().is_success()
    }

    /// Gets a header value by name (case-insensitive).
    fn header(&self, name: &str) -> Option<&str> {
        self.headers()
            .get(&name.to_lowercase())
            .map(|s| s.as_str())
    }

    /// Returns the Content-Type header value.
    fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_as_str() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Post.as_str(), "POST");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
        assert_eq!(HttpMethod::Options.as_str(), "OPTIONS");
    }

    #[test]
    fn test_http_method_from_str() {
        assert_eq!(HttpMethod::from_str("GET").unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::from_str("get").unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::from_str("Put").unwrap(), HttpMethod::Put);
        assert!(HttpMethod::from_str("FETCH").is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(HttpMethod::default(), HttpMethod::Get);
        assert_eq!(DataFormat::default(), DataFormat::Json);
        assert!(HttpStatus::default().is_none());
    }

    #[test]
    fn test_data_format_content_type() {
        assert_eq!(DataFormat::Json.content_type(), Some("application/json"));
        assert_eq!(DataFormat::Xml.content_type(), Some("application/xml"));
        assert_eq!(DataFormat::None.content_type(), None);
    }

    #[test]
    fn test_http_status_helpers() {
        assert!(HttpStatus::OK.is_ok());
        assert!(!HttpStatus::CREATED.is_ok());
        assert!(HttpStatus::CREATED.is_success());
        assert!(HttpStatus::NOT_FOUND.is_client_error());
        assert!(HttpStatus::BAD_GATEWAY.is_server_error());
        assert!(HttpStatus(301).is_redirect());
        assert!(HttpStatus::NONE.is_none());

        let code: u16 = HttpStatus::from(404).into();
        assert_eq!(code, 404);
    }
}
