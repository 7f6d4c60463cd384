//! Provider Implementations
//!
//! The backend is picked once from the resolved configuration and held as a
//! closed [`Provider`] variant:
//!
//! | `provider`    | `runtime` | variant                |
//! |---------------|-----------|------------------------|
//! | `ollama`      | any       | [`Provider::Ollama`]   |
//! | `huggingface` | `cloud`   | [`Provider::HuggingFaceCloud`] |
//! | `huggingface` | `local`   | [`Provider::HuggingFaceLocal`] |

pub mod huggingface;
pub mod ollama;

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::Config;
use crate::error::LlmError;
use crate::streaming::TokenStream;
use crate::traits::ProviderRuntime;
use crate::types::{GenerationParams, Message};

pub use huggingface::{EngineLoader, HfCloudRuntime, HfLocalRuntime, LocalEngine};
pub use ollama::OllamaProvider;

/// Backend family selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Ollama,
    HuggingFace,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::HuggingFace => write!(f, "huggingface"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            other => Err(LlmError::configuration(
                format!("unknown provider `{other}`"),
                "Set provider to ollama or huggingface.",
            )),
        }
    }
}

/// Execution mode selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    Local,
    Cloud,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Cloud => write!(f, "cloud"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "cloud" => Ok(Self::Cloud),
            other => Err(LlmError::configuration(
                format!("unknown runtime `{other}`"),
                "Set runtime to local or cloud.",
            )),
        }
    }
}

/// A concrete backend.
#[derive(Debug)]
pub enum Provider {
    Ollama(OllamaProvider),
    HuggingFaceCloud(HfCloudRuntime),
    HuggingFaceLocal(HfLocalRuntime),
}

impl Provider {
    /// Instantiate the backend selected by `config`.
    ///
    /// `loader` is only consulted by the local Hugging Face mode.
    pub fn from_config(
        config: &Config,
        loader: Option<Arc<dyn EngineLoader>>,
    ) -> Result<Self, LlmError> {
        let kind: ProviderKind = config.provider.parse()?;
        let provider = match kind {
            ProviderKind::Ollama => Self::Ollama(OllamaProvider::new(config)?),
            ProviderKind::HuggingFace => match config.runtime.parse::<ExecutionMode>()? {
                ExecutionMode::Cloud => Self::HuggingFaceCloud(HfCloudRuntime::new(config)?),
                ExecutionMode::Local => {
                    Self::HuggingFaceLocal(HfLocalRuntime::new(config, loader)?)
                }
            },
        };
        tracing::debug!(provider = provider.name(), model = %config.model, "provider instantiated");
        Ok(provider)
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Ollama(_) => ProviderKind::Ollama,
            Self::HuggingFaceCloud(_) | Self::HuggingFaceLocal(_) => ProviderKind::HuggingFace,
        }
    }

    fn runtime(&self) -> &dyn ProviderRuntime {
        match self {
            Self::Ollama(p) => p,
            Self::HuggingFaceCloud(p) => p,
            Self::HuggingFaceLocal(p) => p,
        }
    }
}

#[async_trait]
impl ProviderRuntime for Provider {
    fn name(&self) -> &'static str {
        self.runtime().name()
    }

    async fn chat(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<String, LlmError> {
        self.runtime().chat(messages, params).await
    }

    async fn stream(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<TokenStream, LlmError> {
        self.runtime().stream(messages, params).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f64>, LlmError> {
        self.runtime().embed(text).await
    }

    async fn health(&self) -> bool {
        self.runtime().health().await
    }
}
