//! Command line rendering and fingerprinting.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Configuration;

/// One rendered command line element.
///
/// Groups are flag/value pairs such as `["-resource-dir", "/path"]` that are
/// always emitted contiguously.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Arg {
    Token(String),
    Group(Vec<String>),
}

impl Arg {
    fn pair(flag: &str, value: impl Into<String>) -> Self {
        Arg::Group(vec![flag.to_string(), value.into()])
    }
}

impl From<&str> for Arg {
    fn from(token: &str) -> Self {
        Arg::Token(token.to_string())
    }
}

/// Flatten rendered args into argv tokens.
pub fn flatten(args: &[Arg]) -> Vec<String> {
    let mut tokens = Vec::with_capacity(args.len() * 2);
    for arg in args {
        match arg {
            Arg::Token(token) => tokens.push(token.clone()),
            Arg::Group(group) => tokens.extend(group.iter().cloned()),
        }
    }
    tokens
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl Configuration {
    /// Render the analyzer invocation for `files`.
    ///
    /// Layout: analyzer, files, `--`, then the options in a fixed order.
    /// Changing this order changes every stored fingerprint.
    pub fn render<P: AsRef<Path>>(&self, files: &[P]) -> Vec<Arg> {
        let mut args = Vec::new();

        args.push(Arg::Token(path_string(&self.analyzer_path)));
        args.extend(files.iter().map(|f| Arg::Token(path_string(f.as_ref()))));
        args.push(Arg::from("--"));

        args.push(Arg::pair("-resource-dir", path_string(&self.resource_dir_path)));
        args.push(Arg::pair("-x", "objective-c"));

        if let Some(ref sysroot) = self.sysroot_path {
            args.push(Arg::pair("-isysroot", path_string(sysroot)));
        }

        args.push(Arg::from(if self.arc_enabled { "-fobjc-arc" } else { "-fno-objc-arc" }));
        args.push(Arg::from(if self.modules_enabled { "-fmodules" } else { "-fno-modules" }));

        if self.assertions_blocked {
            args.push(Arg::from("-DNS_BLOCK_ASSERTIONS=1"));
        }
        if self.debug {
            args.push(Arg::from("-debug"));
        }

        for filter in &self.filters {
            args.push(Arg::pair("-filter", filter.as_str()));
        }

        for entry in &self.header_search_paths {
            args.push(Arg::pair(entry.kind.flag(), path_string(&entry.path)));
        }

        if let Some(ref arch) = self.arch {
            args.push(Arg::pair("-arch", arch.as_str()));
        }

        args.extend(self.other_flags.iter().cloned());

        args
    }

    /// Flattened argv for analyzing `files`.
    pub fn command_line<P: AsRef<Path>>(&self, files: &[P]) -> Vec<String> {
        flatten(&self.render(files))
    }

    /// Canonical string identifying this configuration.
    ///
    /// Rendered without files, so the selection of sources never affects it.
    pub fn fingerprint(&self) -> String {
        let tokens = self.command_line::<&Path>(&[]);
        serde_json::to_string(&tokens).unwrap_or_else(|_| tokens.join(" "))
    }
}
