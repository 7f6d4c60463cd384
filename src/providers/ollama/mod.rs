//! Ollama Provider Module
//!
//! Remote model server backend. Talks to `/api/tags`, `/api/pull`,
//! `/api/chat` and `/api/embeddings`.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::{DEFAULT_BASE_URL, OllamaProvider};
pub use types::{OllamaModel, PullProgress};
