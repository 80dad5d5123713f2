//! Xcode build settings.
//!
//! Reads the settings a Run Script phase receives and turns them into the
//! analyzer [`Configuration`] for the target being built.

mod filters;

pub use filters::{parse_filters, read_filters, FILTER_FILE_NAME};

use std::io;
use std::path::{Path, PathBuf};

use nullarihyon_config::{Configuration, HeaderSearchKind, PathResolutionError};
use tracing::debug;
use walkdir::WalkDir;

use crate::env::{BuildEnv, EnvError};

/// Error building the configuration from Xcode settings
#[derive(Debug, thiserror::Error)]
pub enum XcodeError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Path(#[from] PathResolutionError),

    #[error("failed to read {}: {source}", path.display())]
    Filters {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Options of the configuration that do not come from build settings.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationOptions {
    pub debug: bool,
    /// Appended after all flags derived from build settings.
    pub extra_flags: Vec<String>,
}

/// Build settings of the target running the script phase.
#[derive(Debug, Clone)]
pub struct XcodeSettings {
    env: BuildEnv,
    project_path: PathBuf,
    target_name: String,
}

impl XcodeSettings {
    /// Requires `PROJECT_FILE_PATH` and `TARGETNAME`.
    pub fn from_env(env: BuildEnv) -> Result<Self, EnvError> {
        let project_path = PathBuf::from(env.require("PROJECT_FILE_PATH")?);
        let target_name = env.require("TARGETNAME")?.to_string();
        Ok(Self {
            env,
            project_path,
            target_name,
        })
    }

    pub fn env(&self) -> &BuildEnv {
        &self.env
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    /// Directory containing the `.xcodeproj`.
    pub fn project_dir(&self) -> &Path {
        self.project_path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn arch(&self) -> Result<&str, EnvError> {
        self.env.require("arch")
    }

    /// `OBJECT_FILE_DIR_<variant>/<arch>`
    pub fn objects_dir(&self) -> Result<PathBuf, EnvError> {
        let variant = self.env.require("variant")?;
        let base = self.env.require(&format!("OBJECT_FILE_DIR_{}", variant))?;
        Ok(Path::new(base).join(self.arch()?))
    }

    pub fn sdkroot_path(&self) -> Option<PathBuf> {
        self.env
            .get("SDKROOT")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    pub fn header_search_paths(&self) -> Vec<PathBuf> {
        self.env.tokens("HEADER_SEARCH_PATHS").into_iter().map(PathBuf::from).collect()
    }

    pub fn framework_search_paths(&self) -> Vec<PathBuf> {
        self.env.tokens("FRAMEWORK_SEARCH_PATHS").into_iter().map(PathBuf::from).collect()
    }

    pub fn other_cflags(&self) -> Vec<String> {
        self.env.tokens("OTHER_CFLAGS")
    }

    pub fn arc_enabled(&self) -> bool {
        self.env.is_yes("CLANG_ENABLE_OBJC_ARC")
    }

    pub fn modules_enabled(&self) -> bool {
        self.env.is_yes("CLANG_ENABLE_MODULES")
    }

    /// `NAME=VALUE` tokens of `GCC_PREPROCESSOR_DEFINITIONS`.
    pub fn preprocessor_definitions(&self) -> Vec<String> {
        self.env.tokens("GCC_PREPROCESSOR_DEFINITIONS")
    }

    /// Prefix header, when the target precompiles one.
    pub fn prefix_header_path(&self) -> Option<PathBuf> {
        if !self.env.is_yes("GCC_PRECOMPILE_PREFIX_HEADER") {
            return None;
        }
        self.env
            .get("GCC_PREFIX_HEADER")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    /// Header maps Xcode generated in `TARGET_TEMP_DIR`, sorted by name.
    pub fn header_map_paths(&self) -> Vec<PathBuf> {
        let Some(dir) = self.env.get("TARGET_TEMP_DIR").filter(|s| !s.is_empty()) else {
            return Vec::new();
        };

        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "hmap"))
            .map(|entry| entry.into_path())
            .collect()
    }

    pub fn filters(&self) -> io::Result<Vec<String>> {
        read_filters(self.project_dir())
    }

    /// Analyzer configuration for this target.
    ///
    /// The order entries are added in is part of the fingerprint.
    pub fn configuration(
        &self,
        analyzer_path: &Path,
        resource_dir_path: &Path,
        options: &ConfigurationOptions,
    ) -> Result<Configuration, XcodeError> {
        let mut config = Configuration::new(analyzer_path, resource_dir_path)?;

        config.set_sysroot_path(self.sdkroot_path());
        config.set_arc_enabled(self.arc_enabled());
        config.set_modules_enabled(self.modules_enabled());
        config.set_assertions_blocked(true);
        config.set_debug(options.debug);

        let filters = self.filters().map_err(|source| XcodeError::Filters {
            path: self.project_dir().join(FILTER_FILE_NAME),
            source,
        })?;
        for filter in filters {
            config.add_filter(filter);
        }

        for path in self.framework_search_paths() {
            config.add_header_search_path(HeaderSearchKind::Framework, path);
        }
        for path in self.header_search_paths() {
            config.add_header_search_path(HeaderSearchKind::Include, path);
        }
        // Swift bridging headers are generated into the objects directory.
        config.add_header_search_path(HeaderSearchKind::Include, self.objects_dir()?);
        for path in self.header_map_paths() {
            config.add_header_search_path(HeaderSearchKind::Include, path);
        }

        config.set_arch(Some(self.arch()?.to_string()));

        for flag in self.other_cflags() {
            config.add_other_flag(flag);
        }
        for definition in self.preprocessor_definitions() {
            config.add_other_flag(format!("-D{}", definition));
        }
        if let Some(header) = self.prefix_header_path() {
            let resolved = self.project_dir().join(&header);
            if resolved.is_file() {
                config.add_other_flag_group(["-include".to_string(), resolved.to_string_lossy().into_owned()]);
            } else {
                debug!(header = %resolved.display(), "prefix header not found, skipping");
            }
        }
        for flag in &options.extra_flags {
            config.add_other_flag(flag.clone());
        }

        Ok(config)
    }
}
