//! Provider capability trait

use async_trait::async_trait;

use crate::error::LlmError;
use crate::streaming::TokenStream;
use crate::types::{GenerationParams, Message};

/// The capability set every backend offers.
///
/// For equivalent inputs, concatenating every fragment of [`stream`] yields
/// exactly what [`chat`] returns.
///
/// [`stream`]: ProviderRuntime::stream
/// [`chat`]: ProviderRuntime::chat
#[async_trait]
pub trait ProviderRuntime: Send + Sync {
    /// Short backend identifier used in logs.
    fn name(&self) -> &'static str;

    /// Complete response for a conversation.
    async fn chat(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<String, LlmError>;

    /// Incremental response for a conversation.
    ///
    /// The returned stream owns everything it needs; it may outlive `self`.
    async fn stream(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<TokenStream, LlmError>;

    /// Vector representation of `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f64>, LlmError>;

    /// Best-effort readiness probe. Never fails; problems read as `false`.
    async fn health(&self) -> bool;
}
