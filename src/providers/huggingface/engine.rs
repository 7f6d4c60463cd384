//! Local execution capability
//!
//! Model loading, tokenization and generation for the in-process mode live
//! outside this crate. Callers plug them in by implementing [`EngineLoader`]
//! and [`LocalEngine`].

use serde_json::{Map, Value};
use std::ops::ControlFlow;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::LlmError;
use crate::types::Message;

/// Device hint from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    /// Probe the hardware and prefer CUDA when present
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl FromStr for Device {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(LlmError::configuration(
                format!("unknown device `{other}`"),
                "Set device to auto, cpu or cuda.",
            )),
        }
    }
}

/// Concrete placement after probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedDevice {
    Cpu,
    Cuda,
}

impl Device {
    /// Resolve against the loader's hardware probe. Only `Auto` probes.
    pub fn resolve(self, loader: &dyn EngineLoader) -> ResolvedDevice {
        match self {
            Self::Cpu => ResolvedDevice::Cpu,
            Self::Cuda => ResolvedDevice::Cuda,
            Self::Auto if loader.cuda_available() => ResolvedDevice::Cuda,
            Self::Auto => ResolvedDevice::Cpu,
        }
    }
}

/// Loads models for in-process execution.
///
/// `load` may block for a long time (downloads, weight loading); it is
/// always called off the async executor.
pub trait EngineLoader: Send + Sync {
    /// Whether a CUDA device is usable.
    fn cuda_available(&self) -> bool;

    /// Load `model_id` onto `device`.
    fn load(&self, model_id: &str, device: ResolvedDevice) -> Result<Arc<dyn LocalEngine>, LlmError>;
}

/// A loaded model. Every method blocks.
pub trait LocalEngine: Send + Sync {
    /// Render a conversation into the model's own prompt format, ending
    /// with the generation prompt for the assistant turn.
    fn apply_chat_template(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// Generate a completion. The returned text starts with `prompt`.
    fn generate(&self, prompt: &str, options: &Map<String, Value>) -> Result<String, LlmError>;

    /// Generate a completion token by token, excluding the prompt.
    ///
    /// Generation stops early when `on_token` returns [`ControlFlow::Break`].
    fn generate_stream(
        &self,
        prompt: &str,
        options: &Map<String, Value>,
        on_token: &mut dyn FnMut(String) -> ControlFlow<()>,
    ) -> Result<(), LlmError>;
}
