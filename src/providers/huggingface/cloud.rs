//! Hosted inference API (cloud mode)
//!
//! Only the content of the last message is sent as `inputs`; earlier turns
//! are not forwarded.

use async_trait::async_trait;
use futures_util::StreamExt;
use secrecy::SecretString;
use serde_json::{Map, Value, json};

use super::auth_headers;
use crate::config::Config;
use crate::error::{LlmError, classify_stream_error, classify_transport_error};
use crate::streaming::{TokenStream, sse_json_values};
use crate::traits::ProviderRuntime;
use crate::types::{GenerationParams, Message};
use crate::utils::{HttpRequestContext, PROBE_TIMEOUT, api_error_from_response, build_client};

pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co";

const PROVIDER_ID: &str = "huggingface";
const AUTH_HINT: &str = "Provide a valid HF_TOKEN in your .model file or environment.";
const UNAVAILABLE_HINT: &str = "Check your internet connection or model ID.";

/// Client for the hosted inference API.
#[derive(Clone)]
pub struct HfCloudRuntime {
    model_id: String,
    endpoint: String,
    token: Option<SecretString>,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for HfCloudRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfCloudRuntime")
            .field("model_id", &self.model_id)
            .field("endpoint", &self.endpoint)
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl HfCloudRuntime {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let model_id = config.hf_model_id().to_string();
        let base = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_INFERENCE_URL)
            .trim_end_matches('/');
        let endpoint = format!("{base}/models/{model_id}");
        reqwest::Url::parse(&endpoint).map_err(|e| {
            LlmError::configuration(
                format!("invalid inference endpoint `{endpoint}`: {e}"),
                "Set base_url to a full URL or leave it unset.",
            )
        })?;

        Ok(Self {
            model_id,
            endpoint,
            token: config.hf_token.clone(),
            http_client: build_client(Some(config.timeout))?,
        })
    }

    /// Model endpoint every request goes to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    fn build_payload(&self, messages: &[Message], params: &GenerationParams, stream: bool) -> Value {
        let inputs = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        let mut parameters: Map<String, Value> = params.to_json_object("max_new_tokens");
        if stream {
            parameters.insert("stream".into(), Value::Bool(true));
        }
        json!({
            "inputs": inputs,
            "parameters": parameters,
            "options": { "wait_for_model": true },
        })
    }

    /// POST `body` to the model endpoint and classify the outcome.
    async fn post(&self, body: &Value, stream: bool) -> Result<reqwest::Response, LlmError> {
        let ctx = HttpRequestContext::new(PROVIDER_ID, self.endpoint.clone(), stream);
        ctx.on_before_send();
        let response = self
            .http_client
            .post(&ctx.url)
            .headers(auth_headers(self.token.as_ref())?)
            .json(body)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, &self.endpoint, UNAVAILABLE_HINT))
            .inspect_err(|e| ctx.on_error(e))?;
        ctx.on_response(&response);
        self.check_status(response).await
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LlmError::authentication(
                format!(
                    "Hugging Face auth failed for model {} (HTTP {})",
                    self.model_id,
                    status.as_u16()
                ),
                AUTH_HINT,
            ));
        }
        if !status.is_success() {
            return Err(api_error_from_response(response).await);
        }
        Ok(response)
    }

    async fn read_json(&self, response: reqwest::Response) -> Result<Value, LlmError> {
        let text = response
            .text()
            .await
            .map_err(|e| classify_transport_error(e, &self.endpoint, UNAVAILABLE_HINT))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Pull the generated text out of a completion response.
fn extract_generated_text(data: &Value) -> String {
    match data {
        Value::Array(items) => items
            .first()
            .and_then(|item| item.get("generated_text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Value::Object(obj) => match obj.get("generated_text").and_then(Value::as_str) {
            Some(text) => text.to_string(),
            None => data.to_string(),
        },
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Decode an embedding response. Only a flat array of numbers is accepted.
fn extract_embedding(data: Value) -> Result<Vec<f64>, LlmError> {
    let Value::Array(items) = data else {
        return Err(LlmError::ParseError(format!(
            "expected an array of numbers, got: {data}"
        )));
    };
    items
        .iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                LlmError::ParseError(format!("embedding element is not a number: {v}"))
            })
        })
        .collect()
}

fn token_fragments(values: crate::streaming::JsonSseStream) -> TokenStream {
    let out = async_stream::stream! {
        let mut values = values;
        while let Some(item) = values.next().await {
            let payload = match item {
                Ok(payload) => payload,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            if let Some(error) = payload.get("error").and_then(Value::as_str) {
                tracing::warn!(%error, "skipping Hugging Face stream error payload");
                continue;
            }

            let Some(token) = payload.get("token") else {
                continue;
            };
            if token.get("special").and_then(Value::as_bool) == Some(true) {
                continue;
            }
            match token.get("text").and_then(Value::as_str) {
                Some(text) if !text.is_empty() => yield Ok(text.to_string()),
                _ => {}
            }
        }
    };
    Box::pin(out)
}

#[async_trait]
impl ProviderRuntime for HfCloudRuntime {
    fn name(&self) -> &'static str {
        "huggingface-cloud"
    }

    async fn chat(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<String, LlmError> {
        let body = self.build_payload(messages, params, false);
        let response = self.post(&body, false).await?;
        let data = self.read_json(response).await?;
        Ok(extract_generated_text(&data))
    }

    async fn stream(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<TokenStream, LlmError> {
        let body = self.build_payload(messages, params, true);
        let response = self.post(&body, true).await?;
        let endpoint = self.endpoint.clone();
        let bytes = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| classify_stream_error(e, &endpoint, UNAVAILABLE_HINT)));
        Ok(token_fragments(sse_json_values(bytes, PROVIDER_ID)))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f64>, LlmError> {
        let body = json!({ "inputs": text });
        let response = self.post(&body, false).await?;
        let data = self.read_json(response).await?;
        extract_embedding(data)
    }

    async fn health(&self) -> bool {
        let headers = match auth_headers(self.token.as_ref()) {
            Ok(headers) => headers,
            Err(_) => return false,
        };
        match self
            .http_client
            .get(&self.endpoint)
            .headers(headers)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status() != reqwest::StatusCode::NOT_FOUND,
            Err(e) => {
                tracing::debug!(target: "lcm::http", endpoint = %self.endpoint, err = %e, "health probe failed");
                false
            }
        }
    }
}
