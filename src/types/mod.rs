//! Shared value types

pub mod message;
pub mod params;

pub use message::{Message, Prompt, Role};
pub use params::GenerationParams;
