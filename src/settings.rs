//! Driver settings (`nullarihyon.toml`)
//!
//! Optional file next to the `.xcodeproj`. Precedence, lowest first:
//! built-in defaults → settings file → CLI flags.
//!
//! ```toml
//! [dispatch]
//! jobs = 4
//! only_latest = true
//! cache_failures = true
//! cache_key = "basename"   # or "path-hash"
//! timeout_secs = 300
//!
//! [analyzer]
//! flags = ["-Wno-objc-designated-initializers"]
//!
//! [targets.MyApp]
//! sources = ["MyApp/AppDelegate.m", "MyApp/main.m"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheKey;
use crate::dispatch::{default_jobs, DispatchOptions, FailurePolicy};

/// Settings file name, looked up beside the project.
pub const SETTINGS_FILE_NAME: &str = "nullarihyon.toml";

/// Error types for settings operations
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// `[dispatch]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Worker count (default: CPU count minus two)
    pub jobs: Option<usize>,

    /// Print a notice instead of cached output for fresh sources
    #[serde(default)]
    pub only_latest: bool,

    /// Cache the output of failing analyzer runs (default: true)
    pub cache_failures: Option<bool>,

    /// Naming of cached result files
    #[serde(default)]
    pub cache_key: CacheKey,

    /// Kill analyzer runs exceeding this many seconds
    pub timeout_secs: Option<u64>,
}

/// `[analyzer]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerSettings {
    /// Extra flags passed after those derived from build settings
    #[serde(default)]
    pub flags: Vec<String>,
}

/// `[targets.<name>]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSettings {
    /// Source files, relative to the project directory or absolute
    #[serde(default)]
    pub sources: Vec<PathBuf>,
}

/// Contents of `nullarihyon.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub dispatch: DispatchSettings,

    #[serde(default)]
    pub analyzer: AnalyzerSettings,

    #[serde(default)]
    pub targets: BTreeMap<String, TargetSettings>,
}

impl Settings {
    /// Load and parse settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse settings from a TOML string
    pub fn parse(s: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Settings beside `project_path`, or defaults when there is no file
    pub fn for_project(project_path: &Path) -> Result<Self, SettingsError> {
        let dir = project_path.parent().unwrap_or_else(|| Path::new("."));
        let path = dir.join(SETTINGS_FILE_NAME);
        if path.is_file() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.dispatch.jobs == Some(0) {
            return Err(SettingsError::ValidationError(
                "dispatch.jobs must be at least 1".to_string(),
            ));
        }
        if self.dispatch.timeout_secs == Some(0) {
            return Err(SettingsError::ValidationError(
                "dispatch.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Dispatch options with CLI overrides applied
    pub fn dispatch_options(&self, jobs: Option<usize>, only_latest: bool) -> DispatchOptions {
        let failure_policy = if self.dispatch.cache_failures.unwrap_or(true) {
            FailurePolicy::CacheAlways
        } else {
            FailurePolicy::SkipFailures
        };

        DispatchOptions {
            jobs: jobs.or(self.dispatch.jobs).unwrap_or_else(default_jobs).max(1),
            only_latest: only_latest || self.dispatch.only_latest,
            failure_policy,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.dispatch.timeout_secs.map(Duration::from_secs)
    }
}
