//! Build environment access.
//!
//! Xcode passes build settings to Run Script phases as environment
//! variables. [`BuildEnv`] holds a snapshot of them so everything downstream
//! reads an explicit map instead of the process environment.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex_lite::Regex;

/// Error for a missing build variable
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("build setting {0} is not set")]
    Missing(String),
}

/// Snapshot of build settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
    vars: BTreeMap<String, String>,
}

impl BuildEnv {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Value of `key`, failing when it is absent or empty.
    pub fn require(&self, key: &str) -> Result<&str, EnvError> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(EnvError::Missing(key.to_string())),
        }
    }

    /// Xcode boolean settings are `YES` / `NO`.
    pub fn is_yes(&self, key: &str) -> bool {
        self.get(key) == Some("YES")
    }

    /// Tokenized value of `key`; empty when unset.
    pub fn tokens(&self, key: &str) -> Vec<String> {
        tokenize_command_line(self.get(key))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.vars.remove(key)
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#""([^"]*)"|'([^']*)'|([^ ]+)"#).expect("token pattern is valid")
    })
}

/// Split a space separated build setting into tokens.
///
/// Tokens may be wrapped in double or single quotes to keep embedded
/// spaces; the quotes are stripped.
pub fn tokenize_command_line(line: Option<&str>) -> Vec<String> {
    let Some(line) = line else {
        return Vec::new();
    };

    token_pattern()
        .captures_iter(line)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| m.as_str().to_string())
        .collect()
}
