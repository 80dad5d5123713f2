//! Analyzer configuration for nullarihyon.
//!
//! A [`Configuration`] is built once per run from the toolchain options of a
//! build and rendered into the analyzer command line. The rendering without
//! any files doubles as the configuration fingerprint, so the emission order
//! in [`Configuration::render`] is fixed.

mod error;
mod render;

pub use error::PathResolutionError;
pub use render::{flatten, Arg};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Kind of a header search entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderSearchKind {
    /// `-I`
    Include,
    /// `-F`
    Framework,
    /// `-iquote`
    Iquote,
    /// `-isystem`
    Isystem,
}

impl HeaderSearchKind {
    /// Compiler flag introducing a search path of this kind.
    pub fn flag(self) -> &'static str {
        match self {
            HeaderSearchKind::Include => "-I",
            HeaderSearchKind::Framework => "-F",
            HeaderSearchKind::Iquote => "-iquote",
            HeaderSearchKind::Isystem => "-isystem",
        }
    }
}

/// A `(kind, path)` header search entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSearchPath {
    pub kind: HeaderSearchKind,
    pub path: PathBuf,
}

/// Toolchain options for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    analyzer_path: PathBuf,
    resource_dir_path: PathBuf,
    sysroot_path: Option<PathBuf>,
    arc_enabled: bool,
    modules_enabled: bool,
    assertions_blocked: bool,
    debug: bool,
    arch: Option<String>,
    filters: Vec<String>,
    header_search_paths: Vec<HeaderSearchPath>,
    other_flags: Vec<Arg>,
}

impl Configuration {
    /// Create a configuration for the given analyzer and `-resource-dir`.
    ///
    /// Both paths must exist; they are stored in canonical form.
    pub fn new(
        analyzer_path: impl AsRef<Path>,
        resource_dir_path: impl AsRef<Path>,
    ) -> Result<Self, PathResolutionError> {
        let analyzer_path = resolve("analyzer", analyzer_path.as_ref())?;
        let resource_dir_path = resolve("resource directory", resource_dir_path.as_ref())?;

        Ok(Self {
            analyzer_path,
            resource_dir_path,
            sysroot_path: None,
            arc_enabled: true,
            modules_enabled: true,
            assertions_blocked: true,
            debug: false,
            arch: None,
            filters: Vec::new(),
            header_search_paths: Vec::new(),
            other_flags: Vec::new(),
        })
    }

    pub fn analyzer_path(&self) -> &Path {
        &self.analyzer_path
    }

    pub fn resource_dir_path(&self) -> &Path {
        &self.resource_dir_path
    }

    pub fn sysroot_path(&self) -> Option<&Path> {
        self.sysroot_path.as_deref()
    }

    pub fn set_sysroot_path(&mut self, path: Option<PathBuf>) {
        self.sysroot_path = path;
    }

    pub fn arc_enabled(&self) -> bool {
        self.arc_enabled
    }

    pub fn set_arc_enabled(&mut self, enabled: bool) {
        self.arc_enabled = enabled;
    }

    pub fn modules_enabled(&self) -> bool {
        self.modules_enabled
    }

    pub fn set_modules_enabled(&mut self, enabled: bool) {
        self.modules_enabled = enabled;
    }

    pub fn assertions_blocked(&self) -> bool {
        self.assertions_blocked
    }

    pub fn set_assertions_blocked(&mut self, blocked: bool) {
        self.assertions_blocked = blocked;
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn arch(&self) -> Option<&str> {
        self.arch.as_deref()
    }

    pub fn set_arch(&mut self, arch: Option<String>) {
        self.arch = arch;
    }

    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Append a diagnostic filter, passed as `-filter <name>`.
    pub fn add_filter(&mut self, name: impl Into<String>) {
        self.filters.push(name.into());
    }

    pub fn header_search_paths(&self) -> &[HeaderSearchPath] {
        &self.header_search_paths
    }

    pub fn add_header_search_path(&mut self, kind: HeaderSearchKind, path: impl Into<PathBuf>) {
        self.header_search_paths.push(HeaderSearchPath {
            kind,
            path: path.into(),
        });
    }

    pub fn other_flags(&self) -> &[Arg] {
        &self.other_flags
    }

    /// Append a single free-form flag.
    pub fn add_other_flag(&mut self, flag: impl Into<String>) {
        self.other_flags.push(Arg::Token(flag.into()));
    }

    /// Append flags that must stay contiguous, e.g. `["-arch", "i386"]`.
    ///
    /// An empty group is ignored and a one-element group is stored as a
    /// plain token.
    pub fn add_other_flag_group<I, S>(&mut self, flags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut group: Vec<String> = flags.into_iter().map(Into::into).collect();
        match group.len() {
            0 => {}
            1 => self.other_flags.push(Arg::Token(group.remove(0))),
            _ => self.other_flags.push(Arg::Group(group)),
        }
    }
}

fn resolve(what: &'static str, path: &Path) -> Result<PathBuf, PathResolutionError> {
    path.canonicalize().map_err(|source| PathResolutionError {
        what,
        path: path.to_path_buf(),
        source,
    })
}
