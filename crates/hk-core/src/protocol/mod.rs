//! Request/response protocol between applets and the backend.
//!
//! # Sub-modules
//!
//! - **`client`** – [`client::ApiClient`]: base-address normalization, path
//!   normalization, and envelope unwrapping for `get`/`post`.
//! - **`envelope`** – The `{ "result": <payload> }` wrapper every backend
//!   response uses.
//! - **`mock`** – An in-memory [`Transport`] for tests.
//!
//! # Why a `Transport` trait?
//!
//! This crate must not depend on a concrete HTTP library.  The request client
//! builds an [`ApiRequest`] and hands it to a `Transport`; the host supplies
//! a reqwest-backed implementation and tests supply [`mock::MockTransport`].

use async_trait::async_trait;
use thiserror::Error;

pub mod client;
pub mod envelope;
pub mod mock;

/// Content type sent with every request body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP method used by the request client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A fully-resolved request ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute URL (`<base><path>`).
    pub url: String,
    /// Serialized JSON body for `POST`; `None` for `GET`.
    pub body: Option<Vec<u8>>,
    /// `Content-Type` header value, present whenever `body` is.
    pub content_type: Option<&'static str>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
            content_type: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Some(body),
            content_type: Some(JSON_CONTENT_TYPE),
        }
    }
}

/// Raw response returned by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network-level failure reported by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be delivered (connection refused, DNS, …).
    #[error("request to {url} failed: {reason}")]
    Unreachable { url: String, reason: String },
    /// The request did not complete within the transport's timeout.
    #[error("request to {url} timed out")]
    TimedOut { url: String },
}

/// Sends [`ApiRequest`]s and returns the raw response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}
