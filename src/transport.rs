//! Transport abstraction for the Ishy HTTP API.
//!
//! The [`Transport`] trait performs exactly one HTTP exchange per call. It
//! knows nothing about endpoints, credentials, or response shapes; those are
//! the [`ApiGateway`](crate::api::ApiGateway)'s job. This keeps the gateway
//! testable against scripted responses and lets hosts plug in whatever HTTP
//! stack they already have.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use ishy_client::error::ApiError;
//! use ishy_client::transport::{HttpRequest, HttpResponse, Transport};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
//!         // Issue the request and hand back status + body text
//!         Ok(HttpResponse::new(200, r#"{"status":"ok"}"#))
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::ApiError;

/// HTTP method used by the Ishy API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// A single outbound request, relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path beginning with `/`, e.g. `/queue`.
    pub path: String,
    /// Query string pairs, unencoded.
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// Serialized JSON body, if any.
    pub body: Option<String>,
}

impl HttpRequest {
    /// A body-less request.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Append a query pair.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the JSON body text.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The raw outcome of an exchange that produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Carries one HTTP request to the Ishy API and returns its response.
///
/// Implementations must not retry and must not interpret status codes: any
/// response that arrived is `Ok`, and only failures to obtain a response
/// (connection refused, DNS, broken body stream) are `Err`, built with
/// [`ApiError::transport`].
///
/// `send` takes `&self` because the status poll and user commands share one
/// transport and may overlap.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Perform the request.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] without a status code if no response arrived.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = HttpRequest::new(Method::Get, "/status").with_header("Authorization", "Bearer k");
        assert_eq!(req.header("authorization"), Some("Bearer k"));
        assert_eq!(req.header("content-type"), None);
    }

    #[test]
    fn success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(404, "").is_success());
    }
}
