//! Processing of a single source file.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use nullarihyon_config::Configuration;
use tracing::{debug, warn};

use super::FailurePolicy;
use crate::cache::{CacheLayout, CachedResult};
use crate::runner::{AnalyzerOutput, AnalyzerRunner};

/// Printed instead of cached output in only-latest mode.
pub const SKIPPED_NOTICE: &str = "Skip printing result because the code is not updated...";

/// What happened to one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The analyzer ran; carries its exit code.
    Analyzed { exit_code: Option<i32> },
    /// Cached output was printed.
    Cached,
    /// Cached output exists but was not printed.
    Skipped,
    /// The analyzer could not be started, or the cache could not be read.
    Failed,
}

/// The printable block for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutput {
    pub source: PathBuf,
    pub outcome: Outcome,
    /// Command line on its own line followed by the analyzer text.
    pub block: String,
}

/// Shared, read-only state of one dispatcher run.
pub(crate) struct JobContext<'a, R: ?Sized> {
    pub configuration: &'a Configuration,
    pub layout: &'a CacheLayout,
    pub runner: &'a R,
    pub force: bool,
    pub only_latest: bool,
    pub failure_policy: FailurePolicy,
}

impl<R: AnalyzerRunner + ?Sized> JobContext<'_, R> {
    pub fn process(&self, source: &Path) -> JobOutput {
        let command_line = self.configuration.command_line(&[source]);
        let mut block = command_line.join(" ");
        block.push('\n');

        let outcome = if self.layout.needs_check(source, self.force) {
            self.analyze(source, &command_line, &mut block)
        } else if self.only_latest {
            debug!(source = %source.display(), "up to date, not printing");
            block.push_str(SKIPPED_NOTICE);
            block.push('\n');
            Outcome::Skipped
        } else {
            match self.layout.read(source) {
                Ok(Some(cached)) => {
                    debug!(source = %source.display(), "up to date, printing cached result");
                    append_cached(&mut block, &cached);
                    Outcome::Cached
                }
                // Removed between the staleness check and the read.
                Ok(None) => self.analyze(source, &command_line, &mut block),
                Err(e) => {
                    warn!(source = %source.display(), error = %e, "cannot read cached result");
                    let _ = writeln!(
                        block,
                        "error: failed to read cached result {}: {}",
                        self.layout.result_path(source).display(),
                        e
                    );
                    Outcome::Failed
                }
            }
        };

        JobOutput {
            source: source.to_path_buf(),
            outcome,
            block,
        }
    }

    fn analyze(&self, source: &Path, command_line: &[String], block: &mut String) -> Outcome {
        debug!(source = %source.display(), "analyzing");

        let output = match self.runner.run(command_line) {
            Ok(output) => output,
            Err(e) => {
                warn!(source = %source.display(), error = %e, "cannot start analyzer");
                let _ = writeln!(
                    block,
                    "error: failed to run analyzer {}: {}",
                    self.configuration.analyzer_path().display(),
                    e
                );
                return Outcome::Failed;
            }
        };

        if self.should_cache(&output) {
            if let Err(e) = self.layout.write(source, &output.text) {
                warn!(source = %source.display(), error = %e, "cannot write cached result");
            }
        } else {
            debug!(source = %source.display(), code = ?output.exit_code, "analyzer failed, cache left untouched");
        }

        block.push_str(&output.text);
        if output.timed_out {
            block.push_str("error: analyzer timed out\n");
        }

        Outcome::Analyzed {
            exit_code: output.exit_code,
        }
    }

    /// Output of a killed analyzer is incomplete and never cached.
    fn should_cache(&self, output: &AnalyzerOutput) -> bool {
        if output.timed_out {
            return false;
        }
        match self.failure_policy {
            FailurePolicy::CacheAlways => true,
            FailurePolicy::SkipFailures => output.success(),
        }
    }
}

fn append_cached(block: &mut String, cached: &CachedResult) {
    let created: DateTime<Local> = cached.modified.into();
    let _ = writeln!(
        block,
        "Read from cache created at {}...",
        created.format("%Y-%m-%d %H:%M:%S %z")
    );
    block.push_str(&cached.text);
}
