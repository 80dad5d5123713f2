//! Incremental analysis dispatcher.
//!
//! One run:
//! 1. compare the configuration fingerprint with the stored one; a change
//!    forces every source to be analyzed,
//! 2. feed the sources into a bounded work queue served by `jobs` workers,
//! 3. each worker renders the command line, analyzes the source or reuses
//!    its cached result, and sends one output block,
//! 4. an aggregator writes blocks to the sink in completion order.
//!
//! Queues are closed by dropping their senders; [`Dispatcher::run`] returns
//! once the aggregator has written every block.

mod aggregator;
mod job;

pub use aggregator::OutputAggregator;
pub use job::{JobOutput, Outcome, SKIPPED_NOTICE};

use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;

use nullarihyon_config::Configuration;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{CacheLayout, FingerprintStore};
use crate::runner::AnalyzerRunner;
use job::JobContext;

/// Whether output of a failing analyzer run replaces the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Cache whatever the analyzer printed, whatever its exit status.
    #[default]
    CacheAlways,
    /// Keep the previous cache when the analyzer exits non-zero.
    SkipFailures,
}

/// Tunables of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Number of concurrent workers (at least one is started).
    pub jobs: usize,
    /// Print a short notice instead of cached output for fresh sources.
    pub only_latest: bool,
    pub failure_policy: FailurePolicy,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            only_latest: false,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Two cores fewer than available, leaving room for the build itself.
pub fn default_jobs() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .saturating_sub(2)
        .max(1)
}

/// Counts of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// The configuration changed since the previous run.
    pub forced: bool,
    pub analyzed: usize,
    /// Analyzed sources whose analyzer exited non-zero.
    pub analyzer_failures: usize,
    pub cached: usize,
    pub skipped: usize,
    /// Sources that produced an error line instead of a result.
    pub errors: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.analyzed + self.cached + self.skipped + self.errors
    }
}

/// Errors that abort a whole run.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to update configuration record {}: {source}", path.display())]
    Fingerprint {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start worker thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("worker thread panicked")]
    WorkerPanicked,

    #[error("failed to write analysis output: {0}")]
    Output(#[source] io::Error),
}

/// Runs the analyzer over the sources of one objects directory.
pub struct Dispatcher<'a, R: AnalyzerRunner + ?Sized> {
    configuration: &'a Configuration,
    layout: &'a CacheLayout,
    runner: &'a R,
    options: DispatchOptions,
}

impl<'a, R: AnalyzerRunner + ?Sized> Dispatcher<'a, R> {
    pub fn new(
        configuration: &'a Configuration,
        layout: &'a CacheLayout,
        runner: &'a R,
        options: DispatchOptions,
    ) -> Self {
        Self {
            configuration,
            layout,
            runner,
            options,
        }
    }

    /// Analyze `sources`, writing one block per source to `sink`.
    ///
    /// Sources are queued in the given order; blocks are written as jobs
    /// complete. Analyzer failures end up in the blocks and never abort the
    /// run.
    pub fn run<W: Write + Send>(
        &self,
        sources: &[PathBuf],
        sink: &mut W,
    ) -> Result<RunSummary, DispatchError> {
        let store = FingerprintStore::new(self.layout.objects_dir());
        let force = store
            .check_and_update(self.configuration)
            .map_err(|source| DispatchError::Fingerprint {
                path: store.path().to_path_buf(),
                source,
            })?;

        let workers = self.options.jobs.max(1);
        info!(
            sources = sources.len(),
            workers,
            force,
            objects_dir = %self.layout.objects_dir().display(),
            "dispatching analysis"
        );

        let context = JobContext {
            configuration: self.configuration,
            layout: self.layout,
            runner: self.runner,
            force,
            only_latest: self.options.only_latest,
            failure_policy: self.options.failure_policy,
        };

        let (work_tx, work_rx) = crossbeam_channel::bounded::<&Path>(workers * 2);
        let (out_tx, out_rx) = crossbeam_channel::unbounded::<JobOutput>();

        let mut summary = thread::scope(|scope| {
            let aggregator = scope.spawn(move || OutputAggregator::new(sink).drain(out_rx));

            let mut handles = Vec::with_capacity(workers);
            let mut spawn_error = None;
            for index in 0..workers {
                let rx = work_rx.clone();
                let tx = out_tx.clone();
                let context = &context;
                let spawned = thread::Builder::new()
                    .name(format!("nullarihyon-worker-{index}"))
                    .spawn_scoped(scope, move || {
                        for source in rx.iter() {
                            if tx.send(context.process(source)).is_err() {
                                break;
                            }
                        }
                    });
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        spawn_error = Some(e);
                        break;
                    }
                }
            }

            // Workers and the aggregator hold the remaining ends; once they
            // are gone the queues disconnect.
            drop(work_rx);
            drop(out_tx);

            if spawn_error.is_none() {
                for source in sources {
                    if work_tx.send(source.as_path()).is_err() {
                        break;
                    }
                }
            }
            drop(work_tx);

            let mut panicked = false;
            for handle in handles {
                panicked |= handle.join().is_err();
            }
            let drained = aggregator.join();

            if let Some(e) = spawn_error {
                return Err(DispatchError::Spawn(e));
            }
            if panicked {
                return Err(DispatchError::WorkerPanicked);
            }
            match drained {
                Ok(result) => result.map_err(DispatchError::Output),
                Err(_) => Err(DispatchError::WorkerPanicked),
            }
        })?;

        summary.forced = force;
        debug!(?summary, "dispatch finished");
        Ok(summary)
    }
}
