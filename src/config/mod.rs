//! Runtime configuration
//!
//! A [`Config`] is resolved once per model from, lowest to highest priority:
//!
//! 1. `~/.model`
//! 2. `./.model`
//! 3. `LCM_*` environment variables (plus `HF_TOKEN`)
//! 4. explicit [`ConfigOverrides`]
//!
//! and never changes afterwards.

pub mod file;
pub mod resolver;

pub use resolver::{ConfigResolver, Env};

use secrecy::SecretString;
use std::time::Duration;

use crate::error::LlmError;

pub const DEFAULT_MODEL: &str = "qwen2.5:7b";
pub const DEFAULT_PROVIDER: &str = "ollama";
pub const DEFAULT_RUNTIME: &str = "local";
pub const DEFAULT_DEVICE: &str = "auto";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model identifier
    pub model: String,
    /// Backend selector (`ollama`, `huggingface`)
    pub provider: String,
    /// Execution mode selector (`local`, `cloud`)
    pub runtime: String,
    /// Backend endpoint override
    pub base_url: Option<String>,
    /// Hugging Face model id, when it differs from `model`
    pub hf_model: Option<String>,
    /// Hugging Face credential
    pub hf_token: Option<SecretString>,
    /// Device hint for local execution (`auto`, `cpu`, `cuda`)
    pub device: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Whether callers prefer streaming by default
    pub stream: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider: DEFAULT_PROVIDER.to_string(),
            runtime: DEFAULT_RUNTIME.to_string(),
            base_url: None,
            hf_model: None,
            hf_token: None,
            device: DEFAULT_DEVICE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            stream: true,
        }
    }
}

impl Config {
    /// Resolve from the standard file locations and the process environment.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self, LlmError> {
        ConfigResolver::new().resolve(overrides)
    }

    /// Model id used by the Hugging Face runtimes.
    pub fn hf_model_id(&self) -> &str {
        self.hf_model.as_deref().unwrap_or(&self.model)
    }

    /// Apply one textual setting. `origin` names the source in errors.
    pub(crate) fn apply(&mut self, key: &str, value: &str, origin: &str) -> Result<(), LlmError> {
        match key {
            "model" => self.model = value.to_string(),
            "provider" => self.provider = value.to_string(),
            "runtime" => self.runtime = value.to_string(),
            "base_url" => self.base_url = Some(value.to_string()),
            "hf_model" => self.hf_model = Some(value.to_string()),
            "hf_token" => self.hf_token = Some(SecretString::from(value.to_string())),
            "device" => self.device = value.to_string(),
            "timeout" => self.timeout = parse_timeout(value, origin)?,
            "stream" => self.stream = parse_bool(key, value, origin)?,
            _ => {
                return Err(LlmError::configuration(
                    format!("unknown setting `{key}` in {origin}"),
                    format!("Use one of: {}.", KNOWN_KEYS.join(", ")),
                ));
            }
        }
        Ok(())
    }
}

/// Setting names accepted in files and overrides.
pub const KNOWN_KEYS: &[&str] = &[
    "model", "provider", "runtime", "base_url", "hf_model", "hf_token", "device", "timeout",
    "stream",
];

/// Caller-supplied settings. Only `Some` values are applied.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub provider: Option<String>,
    pub runtime: Option<String>,
    pub base_url: Option<String>,
    pub hf_model: Option<String>,
    pub hf_token: Option<SecretString>,
    pub device: Option<String>,
    pub timeout: Option<Duration>,
    pub stream: Option<bool>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value from its textual form, validating key and type.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<&mut Self, LlmError> {
        let value = value.into();
        const ORIGIN: &str = "overrides";
        match key {
            "model" => self.model = Some(value),
            "provider" => self.provider = Some(value),
            "runtime" => self.runtime = Some(value),
            "base_url" => self.base_url = Some(value),
            "hf_model" => self.hf_model = Some(value),
            "hf_token" => self.hf_token = Some(SecretString::from(value)),
            "device" => self.device = Some(value),
            "timeout" => self.timeout = Some(parse_timeout(&value, ORIGIN)?),
            "stream" => self.stream = Some(parse_bool(key, &value, ORIGIN)?),
            _ => {
                return Err(LlmError::configuration(
                    format!("unknown override `{key}`"),
                    format!("Use one of: {}.", KNOWN_KEYS.join(", ")),
                ));
            }
        }
        Ok(self)
    }

    /// Build overrides from textual pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, LlmError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut overrides = Self::new();
        for (key, value) in pairs {
            overrides.set(key.as_ref(), value)?;
        }
        Ok(overrides)
    }

    /// Whether `key` carries an override value.
    pub(crate) fn is_set(&self, key: &str) -> bool {
        match key {
            "model" => self.model.is_some(),
            "provider" => self.provider.is_some(),
            "runtime" => self.runtime.is_some(),
            "base_url" => self.base_url.is_some(),
            "hf_model" => self.hf_model.is_some(),
            "hf_token" => self.hf_token.is_some(),
            "device" => self.device.is_some(),
            "timeout" => self.timeout.is_some(),
            "stream" => self.stream.is_some(),
            _ => false,
        }
    }

    pub(crate) fn apply_to(&self, config: &mut Config) {
        if let Some(v) = &self.model {
            config.model = v.clone();
        }
        if let Some(v) = &self.provider {
            config.provider = v.clone();
        }
        if let Some(v) = &self.runtime {
            config.runtime = v.clone();
        }
        if let Some(v) = &self.base_url {
            config.base_url = Some(v.clone());
        }
        if let Some(v) = &self.hf_model {
            config.hf_model = Some(v.clone());
        }
        if let Some(v) = &self.hf_token {
            config.hf_token = Some(v.clone());
        }
        if let Some(v) = &self.device {
            config.device = v.clone();
        }
        if let Some(v) = self.timeout {
            config.timeout = v;
        }
        if let Some(v) = self.stream {
            config.stream = v;
        }
    }
}

fn parse_timeout(value: &str, origin: &str) -> Result<Duration, LlmError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| {
            LlmError::configuration(
                format!("`timeout` in {origin} must be whole seconds, got `{value}`"),
                "Set timeout to a non-negative integer, e.g. timeout=120.",
            )
        })
}

fn parse_bool(key: &str, value: &str, origin: &str) -> Result<bool, LlmError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(LlmError::configuration(
            format!("`{key}` in {origin} must be a boolean, got `{value}`"),
            format!("Set {key} to true or false."),
        )),
    }
}
