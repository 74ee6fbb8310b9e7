//! In-memory transport for unit and integration testing.
//!
//! Lets tests script backend responses per URL and inspect every request the
//! request client sent, without a running HTTP server.  URLs with no scripted
//! response answer with HTTP 404.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{ApiRequest, ApiResponse, Transport, TransportError};

#[derive(Debug, Clone)]
enum Route {
    Respond(ApiResponse),
    Fail,
}

/// A scripted [`Transport`] that records the requests it receives.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, Route>>,
    delays: Mutex<HashMap<String, Duration>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers requests for `url` with `response`.
    pub fn respond(&self, url: &str, response: ApiResponse) {
        locked(&self.routes).insert(url.to_string(), Route::Respond(response));
    }

    /// Answers requests for `url` with HTTP 200 and `doc` as the body.
    pub fn respond_json(&self, url: &str, doc: Value) {
        self.respond(url, ApiResponse::ok(doc.to_string()));
    }

    /// Makes requests for `url` fail at the network level.
    pub fn fail(&self, url: &str) {
        locked(&self.routes).insert(url.to_string(), Route::Fail);
    }

    /// Delays the response for `url` by `delay`.
    pub fn delay(&self, url: &str, delay: Duration) {
        locked(&self.delays).insert(url.to_string(), delay);
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        locked(&self.requests).clone()
    }

    /// URLs of every request received so far, in arrival order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = request.url.clone();
        locked(&self.requests).push(request);

        let delay = locked(&self.delays).get(&url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let route = locked(&self.routes).get(&url).cloned();
        match route {
            Some(Route::Respond(response)) => Ok(response),
            Some(Route::Fail) => Err(TransportError::Unreachable {
                url,
                reason: "connection refused".to_string(),
            }),
            None => Ok(ApiResponse {
                status: 404,
                body: b"{}".to_vec(),
            }),
        }
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
