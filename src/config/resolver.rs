//! Layered configuration resolution

use std::collections::HashMap;
use std::path::PathBuf;

use super::{Config, ConfigOverrides, KNOWN_KEYS, file};
use crate::error::LlmError;

/// Config file name looked up in the home and project directories.
pub const CONFIG_FILE_NAME: &str = ".model";

/// Environment variable to setting map, in priority order.
///
/// When several variables target the same setting, the first one that is set
/// and non-empty wins.
pub const ENV_MAP: &[(&str, &str)] = &[
    ("LCM_MODEL", "model"),
    ("LCM_PROVIDER", "provider"),
    ("LCM_RUNTIME", "runtime"),
    ("LCM_BASE_URL", "base_url"),
    ("LCM_HF_MODEL", "hf_model"),
    ("LCM_HF_TOKEN", "hf_token"),
    ("HF_TOKEN", "hf_token"),
    ("LCM_DEVICE", "device"),
    ("LCM_TIMEOUT", "timeout"),
    ("LCM_STREAM", "stream"),
];

/// Source of environment variables.
#[derive(Debug, Clone, Default)]
pub enum Env {
    /// The live process environment
    #[default]
    Process,
    /// A fixed snapshot
    Fixed(HashMap<String, String>),
}

impl Env {
    pub fn fixed<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fixed(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn get(&self, name: &str) -> Option<String> {
        match self {
            Self::Process => std::env::var(name).ok(),
            Self::Fixed(vars) => vars.get(name).cloned(),
        }
    }
}

/// Merges config files, environment and overrides into one [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    home_file: Option<PathBuf>,
    project_file: Option<PathBuf>,
    env: Env,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    /// Resolver over `~/.model`, `./.model` and the process environment.
    pub fn new() -> Self {
        Self {
            home_file: dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME)),
            project_file: Some(PathBuf::from(CONFIG_FILE_NAME)),
            env: Env::Process,
        }
    }

    pub fn with_home_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.home_file = Some(path.into());
        self
    }

    pub fn without_home_file(mut self) -> Self {
        self.home_file = None;
        self
    }

    pub fn with_project_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_file = Some(path.into());
        self
    }

    pub fn without_project_file(mut self) -> Self {
        self.project_file = None;
        self
    }

    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Resolve a configuration; later layers win on key collision.
    pub fn resolve(&self, overrides: &ConfigOverrides) -> Result<Config, LlmError> {
        // Last writer wins per key; the origin is kept for error messages.
        let mut layered: HashMap<&'static str, (String, String)> = HashMap::new();

        for path in [&self.home_file, &self.project_file].into_iter().flatten() {
            let origin = path.display().to_string();
            for (key, value) in file::read_file(path, &self.env)? {
                match KNOWN_KEYS.iter().find(|k| **k == key) {
                    Some(known) => {
                        layered.insert(*known, (value, origin.clone()));
                    }
                    None => tracing::debug!(%key, file = %origin, "ignoring unknown config key"),
                }
            }
        }

        let mut from_env: HashMap<&'static str, (String, String)> = HashMap::new();
        for (var, key) in ENV_MAP {
            if from_env.contains_key(key) {
                continue;
            }
            if let Some(value) = self.env.get(var).filter(|v| !v.is_empty()) {
                from_env.insert(*key, (value, format!("${var}")));
            }
        }
        layered.extend(from_env);

        let mut config = Config::default();
        // Deterministic application order keeps error reporting stable.
        // Overridden keys are never parsed from lower layers.
        for key in KNOWN_KEYS {
            if overrides.is_set(key) {
                continue;
            }
            if let Some((value, origin)) = layered.get(key) {
                config.apply(key, value, origin)?;
            }
        }
        overrides.apply_to(&mut config);

        tracing::debug!(
            model = %config.model,
            provider = %config.provider,
            runtime = %config.runtime,
            "resolved configuration"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use secrecy::ExposeSecret;
    use std::time::Duration;

    fn isolated(env: &[(&str, &str)]) -> ConfigResolver {
        ConfigResolver::new()
            .without_home_file()
            .without_project_file()
            .with_env(Env::fixed(env.iter().map(|(k, v)| (*k, *v))))
    }

    #[test]
    fn no_sources_gives_defaults() {
        let config = isolated(&[]).resolve(&ConfigOverrides::default()).unwrap();
        assert_eq!(config.model, crate::config::DEFAULT_MODEL);
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn prefixed_token_variable_wins_over_plain() {
        let config = isolated(&[("HF_TOKEN", "plain"), ("LCM_HF_TOKEN", "prefixed")])
            .resolve(&ConfigOverrides::default())
            .unwrap();
        assert_eq!(config.hf_token.unwrap().expose_secret(), "prefixed");

        let config = isolated(&[("HF_TOKEN", "plain")])
            .resolve(&ConfigOverrides::default())
            .unwrap();
        assert_eq!(config.hf_token.unwrap().expose_secret(), "plain");
    }

    #[test]
    fn empty_environment_value_is_absent() {
        let config = isolated(&[("LCM_MODEL", "")])
            .resolve(&ConfigOverrides::default())
            .unwrap();
        assert_eq!(config.model, crate::config::DEFAULT_MODEL);
    }

    #[test]
    fn malformed_environment_timeout_names_variable() {
        let err = isolated(&[("LCM_TIMEOUT", "ten")])
            .resolve(&ConfigOverrides::default())
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.to_string().contains("$LCM_TIMEOUT"));
    }

    #[test]
    fn override_shadows_malformed_lower_value() {
        let overrides = ConfigOverrides::from_pairs([("timeout", "30")]).unwrap();
        let config = isolated(&[("LCM_TIMEOUT", "ten")]).resolve(&overrides).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[tracing_test::traced_test]
    #[test]
    fn unknown_file_key_is_ignored_and_traced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".model");
        std::fs::write(&path, "colour=blue\nmodel=llama3\n").unwrap();

        let config = isolated(&[])
            .with_project_file(&path)
            .resolve(&ConfigOverrides::default())
            .unwrap();
        assert_eq!(config.model, "llama3");
        assert!(logs_contain("ignoring unknown config key"));
    }
}
