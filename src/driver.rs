//! Xcode Run Script entry point.
//!
//! Everything that can fail for the run as a whole (missing settings,
//! unresolvable paths, unknown target) is checked in [`XcodeRun::prepare`],
//! before any analyzer is started.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nullarihyon_config::Configuration;
use tracing::info;

use crate::cache::CacheLayout;
use crate::dispatch::{DispatchError, DispatchOptions, Dispatcher, RunSummary};
use crate::env::{BuildEnv, EnvError};
use crate::project::{source_provider, ProjectError};
use crate::runner::AnalyzerRunner;
use crate::settings::{Settings, SettingsError};
use crate::xcode::{ConfigurationOptions, XcodeError, XcodeSettings};

/// Errors that stop the driver before or during dispatch
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Xcode(#[from] XcodeError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Command line inputs of the `xcode` command.
#[derive(Debug, Clone, Default)]
pub struct XcodeRequest {
    pub analyzer_path: PathBuf,
    pub resource_dir_path: PathBuf,
    pub jobs: Option<usize>,
    pub only_latest: bool,
    pub debug: bool,
    /// Settings file; defaults to `nullarihyon.toml` beside the project.
    pub settings_path: Option<PathBuf>,
}

/// A fully resolved run, ready to dispatch.
#[derive(Debug)]
pub struct XcodeRun {
    configuration: Configuration,
    layout: CacheLayout,
    sources: Vec<PathBuf>,
    options: DispatchOptions,
    timeout: Option<Duration>,
}

impl XcodeRun {
    /// Resolve settings, configuration and sources from the build environment.
    pub fn prepare(request: &XcodeRequest, env: BuildEnv) -> Result<Self, DriverError> {
        let xcode = XcodeSettings::from_env(env)?;

        let settings = match request.settings_path {
            Some(ref path) => Settings::from_file(path)?,
            None => Settings::for_project(xcode.project_path())?,
        };

        let configuration = xcode.configuration(
            &request.analyzer_path,
            &request.resource_dir_path,
            &ConfigurationOptions {
                debug: request.debug,
                extra_flags: settings.analyzer.flags.clone(),
            },
        )?;

        let sources = source_provider(xcode.env(), &settings)
            .sources(xcode.project_path(), xcode.target_name())?;

        let layout = CacheLayout::new(xcode.objects_dir()?, settings.dispatch.cache_key);
        let options = settings.dispatch_options(request.jobs, request.only_latest);

        info!(
            project = %xcode.project_path().display(),
            target = xcode.target_name(),
            sources = sources.len(),
            "prepared analysis run"
        );

        Ok(Self {
            configuration,
            layout,
            sources,
            options,
            timeout: settings.timeout(),
        })
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn objects_dir(&self) -> &Path {
        self.layout.objects_dir()
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Analyzer timeout from the settings file.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Dispatch every source, writing blocks to `sink`.
    pub fn run<R, W>(&self, runner: &R, sink: &mut W) -> Result<RunSummary, DriverError>
    where
        R: AnalyzerRunner + ?Sized,
        W: Write + Send,
    {
        let dispatcher = Dispatcher::new(&self.configuration, &self.layout, runner, self.options.clone());
        Ok(dispatcher.run(&self.sources, sink)?)
    }
}
