//! In-process execution (local mode)
//!
//! Generation is delegated to a [`LocalEngine`] produced by an injected
//! [`EngineLoader`]. The engine is loaded on first use and kept for the
//! lifetime of the runtime.

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use secrecy::SecretString;
use serde_json::{Map, Value};
use std::fmt;
use std::ops::ControlFlow;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use super::auth_headers;
use super::engine::{Device, EngineLoader, LocalEngine};
use crate::config::Config;
use crate::error::LlmError;
use crate::streaming::TokenStream;
use crate::traits::ProviderRuntime;
use crate::types::{GenerationParams, Message};
use crate::utils::{PROBE_TIMEOUT, build_client};

pub const DEFAULT_HUB_URL: &str = "https://huggingface.co";
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 512;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Hugging Face model executed in-process.
pub struct HfLocalRuntime {
    model_id: String,
    device: Device,
    token: Option<SecretString>,
    loader: Option<Arc<dyn EngineLoader>>,
    engine: Arc<OnceCell<Arc<dyn LocalEngine>>>,
    hub_url: String,
    http_client: reqwest::Client,
}

impl fmt::Debug for HfLocalRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HfLocalRuntime")
            .field("model_id", &self.model_id)
            .field("device", &self.device)
            .field("has_loader", &self.loader.is_some())
            .field("loaded", &self.engine.get().is_some())
            .finish()
    }
}

impl HfLocalRuntime {
    pub fn new(config: &Config, loader: Option<Arc<dyn EngineLoader>>) -> Result<Self, LlmError> {
        Ok(Self {
            model_id: config.hf_model_id().to_string(),
            device: config.device.parse()?,
            token: config.hf_token.clone(),
            loader,
            engine: Arc::new(OnceCell::new()),
            hub_url: DEFAULT_HUB_URL.to_string(),
            http_client: build_client(Some(config.timeout))?,
        })
    }

    /// Use a different hub for the metadata lookup behind [`health`](ProviderRuntime::health).
    pub fn with_hub_url(mut self, hub_url: impl Into<String>) -> Self {
        self.hub_url = hub_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Whether the engine has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.engine.get().is_some()
    }

    /// Load the engine on first use. Concurrent first calls load once.
    async fn engine(&self) -> Result<Arc<dyn LocalEngine>, LlmError> {
        if let Some(engine) = self.engine.get() {
            return Ok(engine.clone());
        }
        let loader = self.loader.clone().ok_or_else(|| {
            LlmError::not_configured(
                format!("no local engine loader installed for `{}`", self.model_id),
                "Install one with Model::builder().engine_loader(..), or set runtime=cloud.",
            )
        })?;

        let cell = self.engine.clone();
        let model_id = self.model_id.clone();
        let device = self.device;
        tokio::task::spawn_blocking(move || {
            cell.get_or_try_init(|| {
                let resolved = device.resolve(loader.as_ref());
                tracing::info!(model = %model_id, device = ?resolved, "loading local engine");
                loader.load(&model_id, resolved)
            })
            .cloned()
        })
        .await
        .map_err(|e| LlmError::InternalError(format!("engine load task failed: {e}")))?
    }
}

/// Generation controls with local defaults filled in.
fn generation_options(params: &GenerationParams) -> Map<String, Value> {
    let mut options = params.to_json_object("max_new_tokens");
    options
        .entry("max_new_tokens")
        .or_insert(Value::from(DEFAULT_MAX_NEW_TOKENS));
    options
        .entry("temperature")
        .or_insert(Value::from(DEFAULT_TEMPERATURE));
    options.entry("do_sample").or_insert(Value::Bool(true));
    options
}

/// Drop the echoed prompt from a completion. Whitespace is kept so the
/// result matches the concatenated stream.
fn strip_prompt(generated: &str, prompt: &str) -> String {
    generated.strip_prefix(prompt).unwrap_or(generated).to_string()
}

#[async_trait]
impl ProviderRuntime for HfLocalRuntime {
    fn name(&self) -> &'static str {
        "huggingface-local"
    }

    async fn chat(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<String, LlmError> {
        let engine = self.engine().await?;
        let messages = messages.to_vec();
        let options = generation_options(params);
        tokio::task::spawn_blocking(move || {
            let prompt = engine.apply_chat_template(&messages)?;
            let generated = engine.generate(&prompt, &options)?;
            Ok(strip_prompt(&generated, &prompt))
        })
        .await
        .map_err(|e| LlmError::InternalError(format!("generation task failed: {e}")))?
    }

    async fn stream(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<TokenStream, LlmError> {
        let engine = self.engine().await?;
        let messages = messages.to_vec();
        let options = generation_options(params);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Result<String, LlmError>>();

        // Detached: the thread exits at the next token once `rx` is dropped.
        std::thread::Builder::new()
            .name("lcm-local-generate".into())
            .spawn(move || {
                let run = AssertUnwindSafe(|| -> Result<(), LlmError> {
                    let prompt = engine.apply_chat_template(&messages)?;
                    engine.generate_stream(&prompt, &options, &mut |token| {
                        if tx.send(Ok(token)).is_err() {
                            // Consumer is gone.
                            ControlFlow::Break(())
                        } else {
                            ControlFlow::Continue(())
                        }
                    })
                });
                let outcome = match catch_unwind(run) {
                    Ok(result) => result,
                    Err(_) => Err(LlmError::InternalError("local generation panicked".into())),
                };
                if let Err(e) = outcome {
                    let _ = tx.send(Err(e));
                }
            })
            .map_err(|e| LlmError::InternalError(format!("failed to spawn generation thread: {e}")))?;

        let out = async_stream::stream! {
            while let Some(item) = rx.recv().await {
                let failed = item.is_err();
                yield item;
                if failed {
                    return;
                }
            }
        };
        Ok(Box::pin(out))
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f64>, LlmError> {
        Err(LlmError::unsupported(
            "local embeddings require a dedicated embedding model",
            "Use provider=ollama or runtime=cloud for embeddings.",
        ))
    }

    async fn health(&self) -> bool {
        let url = format!("{}/api/models/{}", self.hub_url, self.model_id);
        let headers = match auth_headers(self.token.as_ref()) {
            Ok(headers) => headers,
            Err(_) => return false,
        };
        match self
            .http_client
            .get(&url)
            .headers(headers)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(target: "lcm::http", url = %url, err = %e, "model metadata lookup failed");
                false
            }
        }
    }
}
