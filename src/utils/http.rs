//! HTTP plumbing shared by the backends
//!
//! Client construction, request logging backed by `tracing` (no sensitive
//! data), and status handling for non-success responses.

use std::time::Duration;

use crate::error::LlmError;

/// Timeout for lightweight probes (inventory, health).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Build an HTTP client. `None` disables the overall request timeout.
pub fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| LlmError::HttpError(format!("failed to build HTTP client: {e}")))
}

/// Context describing one outgoing request, used for logging.
#[derive(Clone, Debug)]
pub struct HttpRequestContext {
    pub provider_id: &'static str,
    pub url: String,
    pub stream: bool,
}

impl HttpRequestContext {
    pub fn new(provider_id: &'static str, url: impl Into<String>, stream: bool) -> Self {
        Self {
            provider_id,
            url: url.into(),
            stream,
        }
    }

    pub fn on_before_send(&self) {
        tracing::debug!(target: "lcm::http", provider=%self.provider_id, url=%self.url, stream=%self.stream, "sending request");
    }

    pub fn on_response(&self, response: &reqwest::Response) {
        tracing::debug!(target: "lcm::http", provider=%self.provider_id, url=%self.url, status=%response.status().as_u16(), "response received");
    }

    pub fn on_error(&self, error: &LlmError) {
        tracing::debug!(target: "lcm::http", provider=%self.provider_id, url=%self.url, stream=%self.stream, err=%error, "request error");
    }
}

/// Turn a non-success response into [`LlmError::ApiError`] carrying the body.
pub async fn api_error_from_response(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        body
    };
    LlmError::api_error(status, message)
}
