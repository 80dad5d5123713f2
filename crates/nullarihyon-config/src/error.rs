//! Configuration errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A required configuration path does not resolve to an existing entry.
#[derive(Debug, Error)]
#[error("cannot resolve {what} path {}: {source}", path.display())]
pub struct PathResolutionError {
    /// Which path failed, e.g. "analyzer".
    pub what: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}
