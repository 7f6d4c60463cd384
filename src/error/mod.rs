//! Error Handling Module
//!
//! This module provides the error type shared by every layer of the crate:
//! - Core error type (`LlmError`) and its coarse `ErrorCategory`
//! - Classification helpers for HTTP transport failures and status codes
//!
//! # Example
//!
//! ```rust,ignore
//! use lcm::error::{ErrorCategory, LlmError};
//!
//! let error = LlmError::authentication("token rejected", "Provide a valid HF_TOKEN.");
//! assert_eq!(error.category(), ErrorCategory::Authentication);
//! assert_eq!(error.hint(), Some("Provide a valid HF_TOKEN."));
//! ```

// Module declarations
mod conversions;
pub mod types;

// Re-exports for public API
pub use conversions::*;
pub use types::*;
