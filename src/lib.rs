//! nullarihyon - incremental nullability analysis for Xcode builds
//!
//! Runs as a Run Script phase after compilation. For every Objective-C
//! source of the target it decides whether the cached analyzer output is
//! still valid, analyzes the stale ones concurrently and prints all results.
//!
//! Cached results and the fingerprint of the last analyzer configuration
//! live in the target's objects directory next to the object files.

pub mod cache;
pub mod dispatch;
pub mod driver;
pub mod env;
pub mod project;
pub mod runner;
pub mod sdk;
pub mod settings;
pub mod xcode;

pub use cache::{CacheKey, CacheLayout, CachedResult, FingerprintStore};
pub use dispatch::{DispatchError, DispatchOptions, Dispatcher, FailurePolicy, JobOutput, Outcome, RunSummary};
pub use driver::{DriverError, XcodeRequest, XcodeRun};
pub use env::{tokenize_command_line, BuildEnv, EnvError};
pub use nullarihyon_config::{Arg, Configuration, HeaderSearchKind, PathResolutionError};
pub use project::{ManifestSources, ProjectError, ScriptInputSources, SourceProvider};
pub use runner::{AnalyzerOutput, AnalyzerRunner, ProcessRunner};
pub use settings::{Settings, SettingsError};
pub use xcode::{XcodeError, XcodeSettings};
