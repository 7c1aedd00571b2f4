//! Transport implementations for the Ishy API.
//!
//! This module provides concrete [`Transport`](crate::Transport) implementations
//! behind feature gates. Enable the corresponding Cargo feature to pull in
//! a transport:
//!
//! | Feature          | Transport         |
//! |------------------|-------------------|
//! | `transport-http` | [`HttpTransport`] |
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), ishy_client::IshyError> {
//! use ishy_client::transport::{HttpRequest, Method, Transport};
//! use ishy_client::HttpTransport;
//!
//! let http = HttpTransport::new("http://localhost:8000")?;
//! let response = http.send(HttpRequest::new(Method::Get, "/status")).await?;
//! println!("server said: {}", response.body);
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "transport-http")]
pub mod http;

#[cfg(feature = "transport-http")]
pub use http::HttpTransport;
