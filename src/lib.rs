//! # lcm
//!
//! One client facade for interchangeable language-model backends:
//!
//! - an Ollama server over HTTP (NDJSON streaming)
//! - the Hugging Face inference API (SSE streaming)
//! - a locally executed Hugging Face model behind [`providers::huggingface::LocalEngine`]
//!
//! Configuration is layered from `~/.model`, `./.model`, `LCM_*` environment
//! variables and explicit overrides, in that order of precedence.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lcm::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), LlmError> {
//!     let model = Model::builder().model("llama3").build()?;
//!
//!     let reply = model.chat("Hello!").await?;
//!     println!("{reply}");
//!
//!     let mut stream = model.stream("Count to five").await?;
//!     while let Some(fragment) = stream.next().await {
//!         print!("{}", fragment?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Every async entry point has a blocking twin (`chat_sync`, `stream_sync`,
//! `embed_sync`, `health_sync`) that works with or without a caller-side
//! runtime.
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod model;
pub mod providers;
pub mod streaming;
pub mod traits;
pub mod types;
pub mod utils;

pub use config::{Config, ConfigOverrides, ConfigResolver, Env};
pub use error::{ErrorCategory, LlmError};
pub use model::{Model, ModelBuilder};
pub use providers::{ExecutionMode, Provider, ProviderKind};
pub use streaming::{BlockingTokenStream, TokenStream};
pub use traits::ProviderRuntime;
pub use types::{GenerationParams, Message, Prompt, Role};

/// Commonly used items
pub mod prelude {
    pub use crate::config::{Config, ConfigOverrides, ConfigResolver};
    pub use crate::error::{ErrorCategory, LlmError};
    pub use crate::model::{Model, ModelBuilder};
    pub use crate::providers::huggingface::{EngineLoader, LocalEngine, ResolvedDevice};
    pub use crate::streaming::{BlockingTokenStream, TokenStream, collect_text};
    pub use crate::traits::ProviderRuntime;
    pub use crate::types::{GenerationParams, Message, Prompt, Role};
    pub use futures_util::StreamExt;
}
