//! The `{ "result": <payload> }` response envelope.
//!
//! Every backend response consumed by the request client is a JSON object
//! with a `result` member.  Callers only ever see the payload.
//!
//! ```text
//! {"result": {"playing": true}}   →  {"playing": true}
//! {"result": null}                →  null
//! {"status": "ok"}                →  EnvelopeError::MissingResult
//! [1, 2, 3]                       →  EnvelopeError::NotAnObject
//! ```

use serde_json::Value;
use thiserror::Error;

/// Name of the envelope member that carries the payload.
pub const RESULT_KEY: &str = "result";

/// Error returned when a decoded document is not a valid envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("response body is not a JSON object")]
    NotAnObject,
    #[error("response envelope has no 'result' member")]
    MissingResult,
}

/// Extracts the payload from a decoded envelope.
///
/// # Errors
///
/// See [`EnvelopeError`].
pub fn unwrap_result(doc: Value) -> Result<Value, EnvelopeError> {
    match doc {
        Value::Object(mut members) => members
            .remove(RESULT_KEY)
            .ok_or(EnvelopeError::MissingResult),
        _ => Err(EnvelopeError::NotAnObject),
    }
}

/// Wraps `payload` in an envelope.  Used by test backends.
pub fn wrap_result(payload: Value) -> Value {
    let mut members = serde_json::Map::new();
    members.insert(RESULT_KEY.to_string(), payload);
    Value::Object(members)
}
