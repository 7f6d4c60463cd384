//! Generation parameters
//!
//! Common sampling controls get typed fields; anything backend-specific goes
//! into [`GenerationParams::extra`] and is forwarded verbatim. Each backend
//! maps the typed fields onto its own wire names.

use serde_json::{Map, Value};

/// Generation controls for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationParams {
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Upper bound on generated tokens
    pub max_tokens: Option<u32>,
    /// Nucleus sampling
    pub top_p: Option<f64>,
    /// Top-k sampling
    pub top_k: Option<u32>,
    /// Stop sequences
    pub stop: Option<Vec<String>>,
    /// Sampling seed
    pub seed: Option<u64>,
    /// Backend-specific knobs, passed through untouched
    pub extra: Map<String, Value>,
}

impl GenerationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub const fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub const fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_stop<I, S>(mut self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop = Some(stop.into_iter().map(Into::into).collect());
        self
    }

    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Add a backend-specific option.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Render as a JSON object using the given wire name for `max_tokens`.
    ///
    /// Typed fields take precedence over an `extra` entry of the same name.
    pub(crate) fn to_json_object(&self, max_tokens_key: &str) -> Map<String, Value> {
        let mut out = self.extra.clone();
        if let Some(t) = self.temperature {
            out.insert("temperature".into(), Value::from(t));
        }
        if let Some(n) = self.max_tokens {
            out.insert(max_tokens_key.into(), Value::from(n));
        }
        if let Some(p) = self.top_p {
            out.insert("top_p".into(), Value::from(p));
        }
        if let Some(k) = self.top_k {
            out.insert("top_k".into(), Value::from(k));
        }
        if let Some(stop) = &self.stop {
            out.insert("stop".into(), Value::from(stop.clone()));
        }
        if let Some(seed) = self.seed {
            out.insert("seed".into(), Value::from(seed));
        }
        out
    }
}
