//! `ApiClient`: the uniform request client shared by every applet instance.
//!
//! The client owns a normalized base address and nothing else, so one client
//! can be cloned into every applet the host mounts.
//!
//! # Normalization rules
//!
//! - The base address always ends with exactly one `/`
//!   (`http://host:8000` and `http://host:8000//` both become `http://host:8000/`).
//! - Leading and trailing `/` are stripped from every request path, so
//!   `get("/music/")` and `get("music")` both request `<base>music`.
//!
//! # Failure contract
//!
//! Every call returns `Result<_, ApiError>`.  Failures are logged at this
//! boundary with `tracing::warn!` and then handed to the caller, who decides
//! whether to retry, surface, or ignore them.

use std::fmt;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::envelope::{unwrap_result, EnvelopeError};
use super::{ApiRequest, Transport, TransportError};

/// Error type for request client operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transport could not complete the request.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The backend answered with a non-2xx status.
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    /// The response body is not valid JSON.
    #[error("response from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    /// The response is JSON but not a `{result: …}` envelope.
    #[error("invalid response envelope from {url}: {source}")]
    Envelope {
        url: String,
        #[source]
        source: EnvelopeError,
    },
    /// The request body could not be serialized.
    #[error("could not serialize request body: {0}")]
    Encode(#[source] serde_json::Error),
    /// The payload does not have the shape the caller asked for.
    #[error("unexpected payload from {url}: {source}")]
    Payload {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Request client bound to one backend base address.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Arc<str>,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// Creates a client for `base_url`, normalizing the trailing separator.
    pub fn new(base_url: impl AsRef<str>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: normalize_base(base_url.as_ref()).into(),
            transport,
        }
    }

    /// The normalized base address (always ends with `/`).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The absolute URL `path` resolves to.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, normalize_path(path))
    }

    /// Reads `path` and returns the envelope payload.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.url_for(path);
        let doc = self.execute(ApiRequest::get(url.clone())).await?;
        self.unwrap(url, doc)
    }

    /// Like [`ApiClient::get`], deserializing the payload into `T`.
    ///
    /// # Errors
    ///
    /// See [`ApiError`]; [`ApiError::Payload`] when the payload does not fit `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url_for(path);
        let payload = self.get(path).await?;
        serde_json::from_value(payload).map_err(|source| ApiError::Payload { url, source })
    }

    /// Writes `body` as JSON to `path` and returns the envelope payload.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        let url = self.url_for(path);
        let bytes = serde_json::to_vec(body).map_err(ApiError::Encode)?;
        let doc = self
            .execute(ApiRequest::post_json(url.clone(), bytes))
            .await?;
        self.unwrap(url, doc)
    }

    /// Posts an empty JSON object (`{}`) to `path`.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn post_empty(&self, path: &str) -> Result<Value, ApiError> {
        self.post(path, &serde_json::Map::new()).await
    }

    /// Like [`ApiClient::post`], deserializing the payload into `T`.
    ///
    /// # Errors
    ///
    /// See [`ApiError`]; [`ApiError::Payload`] when the payload does not fit `T`.
    pub async fn post_as<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url_for(path);
        let payload = self.post(path, body).await?;
        serde_json::from_value(payload).map_err(|source| ApiError::Payload { url, source })
    }

    /// Reads `path` as a plain JSON document, without envelope unwrapping.
    ///
    /// Used for resources that are not wrapped, such as the discovery
    /// manifest and applet descriptors.  Only leading separators are
    /// stripped, so `"/_/"` requests `<base>_/`.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn fetch_document(&self, path: &str) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path.trim_start_matches('/'));
        self.execute(ApiRequest::get(url)).await
    }

    async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = request.url.clone();
        debug!(method = ?request.method, %url, "sending request");

        let result = match self.transport.send(request).await {
            Ok(resp) if !resp.is_success() => Err(ApiError::Status {
                url: url.clone(),
                status: resp.status,
            }),
            Ok(resp) => serde_json::from_slice::<Value>(&resp.body).map_err(|source| {
                ApiError::Decode {
                    url: url.clone(),
                    source,
                }
            }),
            Err(e) => Err(ApiError::Transport(e)),
        };

        if let Err(ref e) = result {
            warn!(%url, "request failed: {e}");
        }
        result
    }

    fn unwrap(&self, url: String, doc: Value) -> Result<Value, ApiError> {
        unwrap_result(doc).map_err(|source| {
            warn!(%url, "request failed: {source}");
            ApiError::Envelope { url, source }
        })
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Ensures `url` ends with exactly one `/`.
pub fn normalize_base(url: &str) -> String {
    format!("{}/", url.trim_end_matches('/'))
}

/// Strips every leading and trailing `/` from `path`.
pub fn normalize_path(path: &str) -> &str {
    path.trim_matches('/')
}

// ── Tests ─────────────────────────────────────────────────────────────────────
