//! Hugging Face Provider Module
//!
//! Two execution modes share this backend:
//! - `cloud`: the hosted inference API over HTTP, streaming via SSE
//! - `local`: an in-process engine plugged in through [`engine`]

pub mod cloud;
pub mod engine;
pub mod local;

pub use cloud::HfCloudRuntime;
pub use engine::{Device, EngineLoader, LocalEngine, ResolvedDevice};
pub use local::HfLocalRuntime;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::LlmError;

/// Build request headers, with a bearer credential when one is configured.
pub(crate) fn auth_headers(token: Option<&SecretString>) -> Result<HeaderMap, LlmError> {
    let mut headers = HeaderMap::new();
    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| {
                LlmError::configuration(
                    format!("invalid Hugging Face token: {e}"),
                    "Remove whitespace or control characters from hf_token.",
                )
            })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}
