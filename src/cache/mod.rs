//! Per-file analysis cache in the objects directory.
//!
//! Layout, rooted at the objects directory of the current variant/arch:
//! - `<stem>.o`: object file written by the build (read only here)
//! - `<stem>.null`: last analyzer output for the source
//! - `nullarihyon.config`: fingerprint of the last configuration
//!
//! Entries are keyed by the source file stem, so two sources sharing a stem
//! in one target collide. [`CacheKey::PathHash`] keys results by a digest of
//! the full source path instead.

mod fingerprint;
mod staleness;

pub use fingerprint::{FingerprintStore, FINGERPRINT_FILE_NAME, NO_CONFIGURATION};
pub use staleness::needs_check;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Extension of cached analyzer output.
pub const RESULT_EXTENSION: &str = "null";

/// Extension of object files produced by the build.
pub const OBJECT_EXTENSION: &str = "o";

/// How cached result file names are derived from source paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheKey {
    /// `<stem>.null`
    #[default]
    Basename,
    /// `<stem>-<sha256 prefix of full path>.null`
    PathHash,
}

/// Cache and object paths for one objects directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    objects_dir: PathBuf,
    key: CacheKey,
}

impl CacheLayout {
    pub fn new(objects_dir: impl Into<PathBuf>, key: CacheKey) -> Self {
        Self {
            objects_dir: objects_dir.into(),
            key,
        }
    }

    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    pub fn key(&self) -> CacheKey {
        self.key
    }

    /// Object file the build produces for `source`.
    pub fn object_path(&self, source: &Path) -> PathBuf {
        self.objects_dir
            .join(format!("{}.{}", file_stem(source), OBJECT_EXTENSION))
    }

    /// Where the analyzer output for `source` is cached.
    pub fn result_path(&self, source: &Path) -> PathBuf {
        let stem = file_stem(source);
        let name = match self.key {
            CacheKey::Basename => format!("{}.{}", stem, RESULT_EXTENSION),
            CacheKey::PathHash => {
                let digest = Sha256::digest(source.to_string_lossy().as_bytes());
                let hash = hex::encode(digest);
                format!("{}-{}.{}", stem, &hash[..16], RESULT_EXTENSION)
            }
        };
        self.objects_dir.join(name)
    }

    pub fn fingerprint_path(&self) -> PathBuf {
        self.objects_dir.join(FINGERPRINT_FILE_NAME)
    }

    /// Whether `source` has to be analyzed again.
    pub fn needs_check(&self, source: &Path, force: bool) -> bool {
        needs_check(&self.object_path(source), &self.result_path(source), force)
    }

    /// Cached output for `source`, if any.
    pub fn read(&self, source: &Path) -> io::Result<Option<CachedResult>> {
        CachedResult::read(&self.result_path(source))
    }

    /// Replace the cached output for `source`.
    pub fn write(&self, source: &Path, text: &str) -> io::Result<()> {
        fs::write(self.result_path(source), text)
    }
}

fn file_stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Analyzer output read back from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResult {
    pub text: String,
    /// Modification time of the cache file.
    pub modified: SystemTime,
}

impl CachedResult {
    /// Read a cache file; `Ok(None)` when it does not exist.
    pub fn read(path: &Path) -> io::Result<Option<Self>> {
        let text = match fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let modified = fs::metadata(path)?.modified()?;
        Ok(Some(Self { text, modified }))
    }
}
