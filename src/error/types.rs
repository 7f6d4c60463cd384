//! Core error types

use thiserror::Error;

/// Coarse classification of an [`LlmError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or unresolvable settings
    Configuration,
    /// The selected backend lacks something it needs to run
    NotConfigured,
    /// The backend endpoint or runtime could not be reached
    Unavailable,
    /// The backend rejected the credential
    Authentication,
    /// The active backend does not offer the capability
    Unsupported,
    /// Any other failure reported by, or while talking to, the backend
    Upstream,
    /// Faults inside this crate (worker threads, schedulers)
    Internal,
}

/// Error type for every operation in the crate.
///
/// Classified variants carry a remediation `hint` which is rendered after the
/// message and available through [`LlmError::hint`].
#[derive(Error, Debug)]
pub enum LlmError {
    /// Malformed or unresolvable settings
    #[error("Configuration error: {message} (fix: {hint})")]
    ConfigurationError { message: String, hint: String },

    /// The selected backend is missing a required field or capability
    #[error("Provider not configured: {message} (fix: {hint})")]
    ProviderNotConfigured { message: String, hint: String },

    /// The target endpoint is unreachable or timed out
    #[error("Runtime unavailable: {message} (fix: {hint})")]
    RuntimeUnavailable { message: String, hint: String },

    /// The credential was rejected
    #[error("Authentication error: {message} (fix: {hint})")]
    AuthenticationError { message: String, hint: String },

    /// The active backend or mode does not support the capability
    #[error("Not implemented: {message} (fix: {hint})")]
    UnsupportedOperation { message: String, hint: String },

    /// Non-success HTTP status not covered by a classified variant
    #[error("API error {code}: {message}")]
    ApiError { code: u16, message: String },

    /// Transport failure that is not a connectivity problem
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// A response or stream payload could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The streaming transfer failed mid-way
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Worker thread or scheduler fault
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl LlmError {
    pub fn configuration(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn not_configured(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::ProviderNotConfigured {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::RuntimeUnavailable {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn authentication(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::AuthenticationError {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
        }
    }

    /// Classification of this error.
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigurationError { .. } => ErrorCategory::Configuration,
            Self::ProviderNotConfigured { .. } => ErrorCategory::NotConfigured,
            Self::RuntimeUnavailable { .. } => ErrorCategory::Unavailable,
            Self::AuthenticationError { .. } => ErrorCategory::Authentication,
            Self::UnsupportedOperation { .. } => ErrorCategory::Unsupported,
            Self::ApiError { .. }
            | Self::HttpError(_)
            | Self::ParseError(_)
            | Self::StreamError(_) => ErrorCategory::Upstream,
            Self::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// Remediation hint, if this error carries one.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::ConfigurationError { hint, .. }
            | Self::ProviderNotConfigured { hint, .. }
            | Self::RuntimeUnavailable { hint, .. }
            | Self::AuthenticationError { hint, .. }
            | Self::UnsupportedOperation { hint, .. } => Some(hint),
            _ => None,
        }
    }

    /// HTTP status code for upstream API errors.
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether an identical call might succeed later.
    ///
    /// Nothing in this crate retries; callers may use this to decide.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RuntimeUnavailable { .. } | Self::StreamError(_) => true,
            Self::ApiError { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}
