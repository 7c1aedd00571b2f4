//! HTTP transport implementation using `reqwest`.
//!
//! # Feature gate
//!
//! This module is only available when the `transport-http` feature is enabled
//! (it is enabled by default).

use async_trait::async_trait;
use reqwest::Url;

use crate::error::{ApiError, IshyError};
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};

/// A [`Transport`] backed by a shared `reqwest` client.
///
/// No request timeout is configured and nothing is retried; a request that
/// fails is reported on the first attempt.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for the given API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`IshyError::Io`] with [`ErrorKind::InvalidInput`](std::io::ErrorKind::InvalidInput)
    /// if `base_url` is not an absolute URL, or if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, IshyError> {
        let base_url = base_url.into();
        Url::parse(&base_url).map_err(|e| {
            IshyError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| IshyError::Io(std::io::Error::other(e)))?;
        Ok(Self::from_client(base_url, http))
    }

    /// Wrap an already-configured `reqwest` client (custom TLS, proxy, timeouts).
    pub fn from_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        let url = self.url(&request.path);
        tracing::debug!(method = request.method.as_str(), url = %url, "sending request");

        let mut builder = self.http.request(method, &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::transport(format!("request to {url} failed: {e}")))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::transport(format!("failed to read response body: {e}")))?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn http_transport_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpTransport>();
    }

    #[test]
    fn new_rejects_relative_url() {
        let err = HttpTransport::new("not-a-valid-url").unwrap_err();
        assert!(matches!(err, IshyError::Io(ref e) if e.kind() == std::io::ErrorKind::InvalidInput));
    }

    #[test]
    fn url_joins_without_double_slashes() {
        let transport = HttpTransport::new("http://localhost:8000/").unwrap();
        assert_eq!(transport.url("/queue"), "http://localhost:8000/queue");
        assert_eq!(transport.url("status"), "http://localhost:8000/status");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let transport = HttpTransport::new("http://127.0.0.1:1").unwrap();
        let err = transport
            .send(HttpRequest::new(Method::Get, "/status"))
            .await
            .unwrap_err();
        assert!(err.status_code.is_none());
    }
}
