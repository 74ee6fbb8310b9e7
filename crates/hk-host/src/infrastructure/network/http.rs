//! `reqwest` implementation of [`Transport`].
//!
//! Non-2xx responses are returned as ordinary [`ApiResponse`]s; deciding
//! what a status code means is the request client's job.  Only failures to
//! get a response at all become [`TransportError`]s.

use std::time::Duration;

use async_trait::async_trait;
use hk_core::{ApiRequest, ApiResponse, Method, Transport, TransportError};
use reqwest::header::CONTENT_TYPE;
use tracing::trace;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let ApiRequest {
            method,
            url,
            body,
            content_type,
        } = request;

        let mut builder = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| map_error(&url, e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| map_error(&url, e))?;
        trace!(%url, status, bytes = body.len(), "response received");

        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn map_error(url: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::TimedOut {
            url: url.to_string(),
        }
    } else {
        TransportError::Unreachable {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
