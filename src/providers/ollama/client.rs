//! Ollama Client Implementation
//!
//! Every chat, stream and embed call first makes sure the configured model
//! is present on the server: the inventory is queried and, when the model is
//! missing, a pull is started and awaited to completion. Nothing is cached
//! between calls.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;

use super::streaming::chat_fragments;
use super::types::*;
use crate::config::Config;
use crate::error::{LlmError, classify_stream_error, classify_transport_error};
use crate::streaming::{TokenStream, ndjson_lines};
use crate::traits::ProviderRuntime;
use crate::types::{GenerationParams, Message};
use crate::utils::{HttpRequestContext, PROBE_TIMEOUT, api_error_from_response, build_client};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

const PROVIDER_ID: &str = "ollama";
const UNAVAILABLE_HINT: &str = "Make sure the Ollama server is running (`ollama serve`) and that base_url points at it.";

/// Ollama Client
#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    /// Client bounded by the configured timeout
    http_client: reqwest::Client,
    /// Client without an overall timeout, for model pulls
    pull_client: reqwest::Client,
}

impl std::fmt::Debug for OllamaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaProvider")
            .field("provider_id", &PROVIDER_ID)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OllamaProvider {
    /// Creates a new Ollama provider from a resolved configuration
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        reqwest::Url::parse(&base_url).map_err(|e| {
            LlmError::configuration(
                format!("invalid Ollama base_url `{base_url}`: {e}"),
                "Set base_url to a full URL such as http://localhost:11434.",
            )
        })?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            http_client: build_client(Some(config.timeout))?,
            pull_client: build_client(None)?,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// List models installed on the server (`GET /api/tags`).
    pub async fn list_models(&self) -> Result<Vec<OllamaModel>, LlmError> {
        let ctx = HttpRequestContext::new(PROVIDER_ID, self.url("/api/tags"), false);
        ctx.on_before_send();
        let response = self
            .http_client
            .get(&ctx.url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, &self.base_url, UNAVAILABLE_HINT))?;
        ctx.on_response(&response);
        if !response.status().is_success() {
            return Err(api_error_from_response(response).await);
        }
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("invalid Ollama inventory: {e}")))?;
        Ok(tags.models)
    }

    /// Whether the configured model is installed. Any failure reads as `false`.
    pub async fn has_model(&self) -> bool {
        match self.list_models().await {
            Ok(models) => models.iter().any(|m| m.matches(&self.model)),
            Err(e) => {
                tracing::debug!(model = %self.model, err = %e, "Ollama inventory check failed");
                false
            }
        }
    }

    /// Pull the configured model and wait until the server reports success.
    pub async fn pull_model(&self) -> Result<(), LlmError> {
        let ctx = HttpRequestContext::new(PROVIDER_ID, self.url("/api/pull"), true);
        ctx.on_before_send();
        let response = self
            .pull_client
            .post(&ctx.url)
            .json(&PullRequest {
                name: &self.model,
                model: &self.model,
                stream: true,
            })
            .send()
            .await
            .map_err(|e| classify_transport_error(e, &self.base_url, UNAVAILABLE_HINT))?;
        ctx.on_response(&response);
        if !response.status().is_success() {
            return Err(api_error_from_response(response).await);
        }

        let base_url = self.base_url.clone();
        let bytes = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| classify_stream_error(e, &base_url, UNAVAILABLE_HINT)));
        let mut lines = ndjson_lines(bytes);

        while let Some(line) = lines.next().await {
            let line = line?;
            let progress: PullProgress = match serde_json::from_str(&line) {
                Ok(progress) => progress,
                Err(e) => {
                    tracing::warn!("skipping malformed Ollama pull line: {}", e);
                    continue;
                }
            };
            if let Some(error) = progress.error {
                return Err(LlmError::api_error(
                    500,
                    format!("pulling `{}` failed: {error}", self.model),
                ));
            }
            tracing::debug!(
                model = %self.model,
                status = %progress.status,
                completed = ?progress.completed,
                total = ?progress.total,
                "pull progress"
            );
            if progress.status == "success" {
                tracing::info!(model = %self.model, "model pulled");
                return Ok(());
            }
        }

        Err(LlmError::api_error(
            502,
            format!("pull of `{}` ended before the server reported success", self.model),
        ))
    }

    /// Ensure-model protocol: pull the model when the inventory lacks it.
    pub async fn ensure_model(&self) -> Result<(), LlmError> {
        if !self.has_model().await {
            tracing::info!(model = %self.model, "model not found on Ollama server, pulling");
            self.pull_model().await?;
        }
        Ok(())
    }

    async fn post_chat(
        &self,
        messages: &[Message],
        params: &GenerationParams,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let ctx = HttpRequestContext::new(PROVIDER_ID, self.url("/api/chat"), stream);
        ctx.on_before_send();
        let body = ChatRequest {
            model: &self.model,
            messages,
            stream,
            options: params.to_json_object("num_predict"),
        };
        let response = self
            .http_client
            .post(&ctx.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, &self.base_url, UNAVAILABLE_HINT))
            .inspect_err(|e| ctx.on_error(e))?;
        ctx.on_response(&response);
        if !response.status().is_success() {
            return Err(api_error_from_response(response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl ProviderRuntime for OllamaProvider {
    fn name(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn chat(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<String, LlmError> {
        self.ensure_model().await?;
        let response = self.post_chat(messages, params, false).await?;
        let text = response
            .text()
            .await
            .map_err(|e| classify_transport_error(e, &self.base_url, UNAVAILABLE_HINT))?;
        let chunk: ChatChunk = serde_json::from_str(&text)?;
        if let Some(error) = chunk.error {
            return Err(LlmError::api_error(500, error));
        }
        chunk
            .message
            .and_then(|m| m.content)
            .ok_or_else(|| LlmError::ParseError("Ollama response has no message content".into()))
    }

    async fn stream(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<TokenStream, LlmError> {
        self.ensure_model().await?;
        let response = self.post_chat(messages, params, true).await?;
        let base_url = self.base_url.clone();
        let bytes = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| classify_stream_error(e, &base_url, UNAVAILABLE_HINT)));
        Ok(chat_fragments(ndjson_lines(bytes)))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f64>, LlmError> {
        self.ensure_model().await?;
        let ctx = HttpRequestContext::new(PROVIDER_ID, self.url("/api/embeddings"), false);
        ctx.on_before_send();
        let response = self
            .http_client
            .post(&ctx.url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| classify_transport_error(e, &self.base_url, UNAVAILABLE_HINT))?;
        ctx.on_response(&response);
        if !response.status().is_success() {
            return Err(api_error_from_response(response).await);
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("invalid Ollama embedding: {e}")))?;
        let parsed: EmbeddingResponse = serde_json::from_value(body)?;
        Ok(parsed.embedding)
    }

    async fn health(&self) -> bool {
        self.has_model().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn default_base_url_is_local_server() {
        let provider = OllamaProvider::new(&Config::default()).unwrap();
        assert_eq!(provider.base_url(), "http://localhost:11434");
        assert_eq!(provider.model(), "qwen2.5:7b");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = Config {
            base_url: Some("http://example.com:8080/".into()),
            ..Config::default()
        };
        let provider = OllamaProvider::new(&config).unwrap();
        assert_eq!(provider.url("/api/tags"), "http://example.com:8080/api/tags");
    }

    #[test]
    fn invalid_base_url_is_configuration_error() {
        let config = Config {
            base_url: Some("not a url".into()),
            ..Config::default()
        };
        let err = OllamaProvider::new(&config).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }
}
