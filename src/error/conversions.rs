//! Conversions from library errors into [`LlmError`]

use super::types::LlmError;

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(format!("JSON error: {err}"))
    }
}

/// Classify a transport failure.
///
/// Connection failures and timeouts become [`LlmError::RuntimeUnavailable`]
/// carrying `hint`; every other transport failure is a generic
/// [`LlmError::HttpError`].
pub fn classify_transport_error(err: reqwest::Error, target: &str, hint: &str) -> LlmError {
    if err.is_connect() || err.is_timeout() {
        LlmError::unavailable(format!("could not reach {target}: {err}"), hint)
    } else {
        LlmError::HttpError(format!("request to {target} failed: {err}"))
    }
}

/// Classify a failure while reading a streaming body.
pub fn classify_stream_error(err: reqwest::Error, target: &str, hint: &str) -> LlmError {
    if err.is_connect() || err.is_timeout() {
        LlmError::unavailable(format!("lost connection to {target}: {err}"), hint)
    } else {
        LlmError::StreamError(format!("stream from {target} failed: {err}"))
    }
}
