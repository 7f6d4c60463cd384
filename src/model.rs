//! Model facade
//!
//! [`Model`] is the entry point: it resolves configuration once, picks the
//! backend on first use and exposes every capability in two flavours, async
//! (`chat`, `stream`, `embed`, `health`) and blocking (`*_sync`).
//!
//! ```rust,no_run
//! use lcm::prelude::*;
//!
//! # fn main() -> Result<(), LlmError> {
//! let model = Model::with_model("llama3")?;
//! for fragment in model.stream_sync("Tell me a joke") {
//!     print!("{}", fragment?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! A `Model` serves one logical caller at a time; overlapping calls on the
//! same instance are not coordinated.

use once_cell::sync::OnceCell;
use secrecy::SecretString;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ConfigOverrides, ConfigResolver};
use crate::error::LlmError;
use crate::providers::{EngineLoader, Provider};
use crate::streaming::{BlockingTokenStream, TokenStream};
use crate::traits::ProviderRuntime;
use crate::types::{GenerationParams, Prompt};
use crate::utils::block_on_private;

/// Unified handle to one configured model.
pub struct Model {
    config: Config,
    provider: OnceCell<Arc<Provider>>,
    engine_loader: Option<Arc<dyn EngineLoader>>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("config", &self.config)
            .field("provider", &self.provider.get())
            .field("has_engine_loader", &self.engine_loader.is_some())
            .finish()
    }
}

impl Model {
    /// Resolve configuration from files and environment, with no overrides.
    pub fn new() -> Result<Self, LlmError> {
        Self::builder().build()
    }

    /// Like [`Model::new`] but with the model name overridden.
    pub fn with_model(model: impl Into<String>) -> Result<Self, LlmError> {
        Self::builder().model(model).build()
    }

    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    /// Wrap an already resolved configuration.
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            provider: OnceCell::new(),
            engine_loader: None,
        }
    }

    /// The resolved configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Backend for this model, instantiated on first call.
    fn provider(&self) -> Result<Arc<Provider>, LlmError> {
        self.provider
            .get_or_try_init(|| {
                Provider::from_config(&self.config, self.engine_loader.clone()).map(Arc::new)
            })
            .cloned()
    }

    pub async fn chat(&self, input: impl Into<Prompt>) -> Result<String, LlmError> {
        self.chat_with(input, &GenerationParams::default()).await
    }

    pub async fn chat_with(
        &self,
        input: impl Into<Prompt>,
        params: &GenerationParams,
    ) -> Result<String, LlmError> {
        let messages = input.into().into_messages();
        self.provider()?.chat(&messages, params).await
    }

    /// Stream the response. Dropping the stream closes the transfer.
    pub async fn stream(&self, input: impl Into<Prompt>) -> Result<TokenStream, LlmError> {
        self.stream_with(input, &GenerationParams::default()).await
    }

    pub async fn stream_with(
        &self,
        input: impl Into<Prompt>,
        params: &GenerationParams,
    ) -> Result<TokenStream, LlmError> {
        let messages = input.into().into_messages();
        self.provider()?.stream(&messages, params).await
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f64>, LlmError> {
        self.provider()?.embed(text).await
    }

    /// Readiness probe. Never fails: any problem reads as `false`.
    pub async fn health(&self) -> bool {
        match self.provider() {
            Ok(provider) => provider.health().await,
            Err(e) => {
                tracing::debug!(err = %e, "health check could not instantiate provider");
                false
            }
        }
    }

    pub fn chat_sync(&self, input: impl Into<Prompt>) -> Result<String, LlmError> {
        self.chat_with_sync(input, &GenerationParams::default())
    }

    pub fn chat_with_sync(
        &self,
        input: impl Into<Prompt>,
        params: &GenerationParams,
    ) -> Result<String, LlmError> {
        let prompt = input.into();
        block_on_private(self.chat_with(prompt, params))?
    }

    /// Blocking iterator over the response fragments.
    ///
    /// The stream is driven on its own worker thread. Errors, including a
    /// failure to start the stream, arrive as the final item.
    pub fn stream_sync(&self, input: impl Into<Prompt>) -> BlockingTokenStream {
        self.stream_with_sync(input, &GenerationParams::default())
    }

    pub fn stream_with_sync(
        &self,
        input: impl Into<Prompt>,
        params: &GenerationParams,
    ) -> BlockingTokenStream {
        let messages = input.into().into_messages();
        let params = params.clone();
        let provider = self.provider();
        BlockingTokenStream::spawn(move || async move {
            let provider = provider?;
            provider.stream(&messages, &params).await
        })
    }

    pub fn embed_sync(&self, text: &str) -> Result<Vec<f64>, LlmError> {
        block_on_private(self.embed(text))?
    }

    pub fn health_sync(&self) -> bool {
        block_on_private(self.health()).unwrap_or(false)
    }
}

/// Builder for [`Model`].
///
/// Setters record explicit overrides, which beat files and environment.
#[derive(Default)]
pub struct ModelBuilder {
    overrides: ConfigOverrides,
    resolver: Option<ConfigResolver>,
    engine_loader: Option<Arc<dyn EngineLoader>>,
}

impl fmt::Debug for ModelBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBuilder")
            .field("overrides", &self.overrides)
            .field("resolver", &self.resolver)
            .field("has_engine_loader", &self.engine_loader.is_some())
            .finish()
    }
}

impl ModelBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.overrides.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.overrides.provider = Some(provider.into());
        self
    }

    pub fn runtime(mut self, runtime: impl Into<String>) -> Self {
        self.overrides.runtime = Some(runtime.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.overrides.base_url = Some(base_url.into());
        self
    }

    pub fn hf_model(mut self, hf_model: impl Into<String>) -> Self {
        self.overrides.hf_model = Some(hf_model.into());
        self
    }

    pub fn hf_token(mut self, token: impl Into<String>) -> Self {
        self.overrides.hf_token = Some(SecretString::from(token.into()));
        self
    }

    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.overrides.device = Some(device.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.overrides.timeout = Some(timeout);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.overrides.stream = Some(stream);
        self
    }

    /// Set an override from its textual key and value.
    pub fn set(mut self, key: &str, value: impl Into<String>) -> Result<Self, LlmError> {
        self.overrides.set(key, value)?;
        Ok(self)
    }

    /// Replace all overrides at once.
    pub fn overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Resolve with custom file locations or environment.
    pub fn resolver(mut self, resolver: ConfigResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Engine loader for the local Hugging Face mode.
    pub fn engine_loader(mut self, loader: Arc<dyn EngineLoader>) -> Self {
        self.engine_loader = Some(loader);
        self
    }

    /// Resolve configuration and build the model. The backend itself is
    /// instantiated on first use.
    pub fn build(self) -> Result<Model, LlmError> {
        let resolver = self.resolver.unwrap_or_else(ConfigResolver::new);
        let config = resolver.resolve(&self.overrides)?;
        Ok(Model {
            config,
            provider: OnceCell::new(),
            engine_loader: self.engine_loader,
        })
    }
}
