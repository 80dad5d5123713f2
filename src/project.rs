//! Source lists of build targets.
//!
//! Parsing `.xcodeproj` files is left to other tools; sources come either
//! from the input files of the Run Script phase or from the `[targets]`
//! table of the settings file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::env::BuildEnv;
use crate::settings::{Settings, TargetSettings};

/// Error looking up the sources of a target
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("Could not find target {target} in {}", project.display())]
    TargetNotFound { target: String, project: PathBuf },

    #[error("invalid SCRIPT_INPUT_FILE_COUNT {0:?}")]
    InvalidInputCount(String),

    #[error("script input {0} is not set")]
    MissingInput(String),
}

/// Supplies the compilable sources of a target, in build order.
pub trait SourceProvider {
    fn sources(&self, project_path: &Path, target: &str) -> Result<Vec<PathBuf>, ProjectError>;
}

fn is_objc_source(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "m")
}

/// Targets listed in `nullarihyon.toml`.
#[derive(Debug, Clone, Default)]
pub struct ManifestSources {
    targets: BTreeMap<String, TargetSettings>,
}

impl ManifestSources {
    pub fn new(settings: &Settings) -> Self {
        Self {
            targets: settings.targets.clone(),
        }
    }
}

impl SourceProvider for ManifestSources {
    fn sources(&self, project_path: &Path, target: &str) -> Result<Vec<PathBuf>, ProjectError> {
        let entry = self
            .targets
            .get(target)
            .ok_or_else(|| ProjectError::TargetNotFound {
                target: target.to_string(),
                project: project_path.to_path_buf(),
            })?;

        let dir = project_path.parent().unwrap_or_else(|| Path::new("."));
        Ok(entry
            .sources
            .iter()
            .map(|path| dir.join(path))
            .filter(|path| is_objc_source(path))
            .collect())
    }
}

/// Input files of the Run Script phase (`SCRIPT_INPUT_FILE_<n>`).
#[derive(Debug, Clone)]
pub struct ScriptInputSources {
    env: BuildEnv,
}

impl ScriptInputSources {
    pub fn new(env: BuildEnv) -> Self {
        Self { env }
    }

    /// Whether the phase declares any input files.
    pub fn is_available(env: &BuildEnv) -> bool {
        env.get("SCRIPT_INPUT_FILE_COUNT")
            .and_then(|count| count.trim().parse::<usize>().ok())
            .is_some_and(|count| count > 0)
    }
}

impl SourceProvider for ScriptInputSources {
    fn sources(&self, project_path: &Path, target: &str) -> Result<Vec<PathBuf>, ProjectError> {
        // Inputs always belong to the target running the phase.
        if self.env.get("TARGETNAME") != Some(target) {
            return Err(ProjectError::TargetNotFound {
                target: target.to_string(),
                project: project_path.to_path_buf(),
            });
        }

        let raw = self.env.get("SCRIPT_INPUT_FILE_COUNT").unwrap_or("0");
        let count: usize = raw
            .trim()
            .parse()
            .map_err(|_| ProjectError::InvalidInputCount(raw.to_string()))?;

        let mut sources = Vec::with_capacity(count);
        for index in 0..count {
            let key = format!("SCRIPT_INPUT_FILE_{}", index);
            let path = self
                .env
                .get(&key)
                .ok_or_else(|| ProjectError::MissingInput(key.clone()))?;
            let path = PathBuf::from(path);
            if is_objc_source(&path) {
                sources.push(path);
            }
        }
        Ok(sources)
    }
}

/// Script inputs when the phase has any, the settings file otherwise.
pub fn source_provider(env: &BuildEnv, settings: &Settings) -> Box<dyn SourceProvider> {
    if ScriptInputSources::is_available(env) {
        Box::new(ScriptInputSources::new(env.clone()))
    } else {
        Box::new(ManifestSources::new(settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_resolves_and_filters() {
        let settings = Settings::parse(
            r#"
            [targets.App]
            sources = ["App/ViewController.m", "App/Bridge.swift", "/abs/main.m", "App/AppDelegate.m"]
            "#,
        )
        .unwrap();
        let provider = ManifestSources::new(&settings);

        let sources = provider.sources(Path::new("/work/App.xcodeproj"), "App").unwrap();
        assert_eq!(
            sources,
            vec![
                PathBuf::from("/work/App/ViewController.m"),
                PathBuf::from("/abs/main.m"),
                PathBuf::from("/work/App/AppDelegate.m"),
            ]
        );
    }

    #[test]
    fn test_manifest_unknown_target() {
        let provider = ManifestSources::default();
        let err = provider.sources(Path::new("/work/App.xcodeproj"), "Nope").unwrap_err();
        assert!(matches!(err, ProjectError::TargetNotFound { ref target, .. } if target == "Nope"));
        assert_eq!(err.to_string(), "Could not find target Nope in /work/App.xcodeproj");
    }

    #[test]
    fn test_script_inputs() {
        let env = BuildEnv::from_pairs([
            ("TARGETNAME", "App"),
            ("SCRIPT_INPUT_FILE_COUNT", "3"),
            ("SCRIPT_INPUT_FILE_0", "/src/b.m"),
            ("SCRIPT_INPUT_FILE_1", "/src/a.h"),
            ("SCRIPT_INPUT_FILE_2", "/src/a.m"),
        ]);
        assert!(ScriptInputSources::is_available(&env));

        let sources = ScriptInputSources::new(env)
            .sources(Path::new("/src/App.xcodeproj"), "App")
            .unwrap();
        assert_eq!(sources, vec![PathBuf::from("/src/b.m"), PathBuf::from("/src/a.m")]);
    }

    #[test]
    fn test_script_inputs_errors() {
        let env = BuildEnv::from_pairs([
            ("TARGETNAME", "App"),
            ("SCRIPT_INPUT_FILE_COUNT", "2"),
            ("SCRIPT_INPUT_FILE_0", "/src/b.m"),
        ]);
        let provider = ScriptInputSources::new(env);
        assert!(matches!(
            provider.sources(Path::new("/p"), "App"),
            Err(ProjectError::MissingInput(k)) if k == "SCRIPT_INPUT_FILE_1"
        ));
        assert!(matches!(
            provider.sources(Path::new("/p"), "Other"),
            Err(ProjectError::TargetNotFound { .. })
        ));
    }

    #[test]
    fn test_provider_selection() {
        let settings = Settings::default();
        let without = BuildEnv::from_pairs([("SCRIPT_INPUT_FILE_COUNT", "0")]);
        assert!(!ScriptInputSources::is_available(&without));
        assert!(source_provider(&without, &settings)
            .sources(Path::new("/p/App.xcodeproj"), "App")
            .is_err());
    }
}
