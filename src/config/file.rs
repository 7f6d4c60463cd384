//! `.model` file parsing
//!
//! One `key=value` pair per line. Blank lines, `#` comments and lines without
//! `=` are skipped. Keys and values are trimmed, then `${NAME}` placeholders
//! in the value are replaced once from the environment (unset names become
//! the empty string).

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::Path;

use super::resolver::Env;
use crate::error::LlmError;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(\w+)\}").expect("placeholder pattern is valid"));

/// Replace every `${NAME}` in `value` with the environment value of `NAME`.
///
/// Substituted text is not scanned again.
pub fn interpolate(value: &str, env: &Env) -> String {
    PLACEHOLDER
        .replace_all(value, |caps: &Captures<'_>| env.get(&caps[1]).unwrap_or_default())
        .into_owned()
}

/// Parse file contents into ordered `(key, value)` pairs.
pub fn parse_str(contents: &str, env: &Env) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), interpolate(value.trim(), env)))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Read and parse a config file. A missing file contributes nothing.
pub fn read_file(path: &Path, env: &Env) -> Result<Vec<(String, String)>, LlmError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            tracing::debug!(path = %path.display(), "loaded config file");
            Ok(parse_str(&contents, env))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(LlmError::configuration(
            format!("cannot read config file {}: {e}", path.display()),
            "Check the file permissions or remove the file.",
        )),
    }
}
