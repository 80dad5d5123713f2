//! Configuration fingerprint record.
//!
//! The objects directory keeps the fingerprint of the configuration used by
//! the previous run. Any difference forces every source in the directory to
//! be analyzed again, since options such as preprocessor definitions can
//! change the meaning of every file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use nullarihyon_config::Configuration;
use tracing::{debug, info};

/// Name of the record file inside the objects directory.
pub const FINGERPRINT_FILE_NAME: &str = "nullarihyon.config";

/// Stand-in for a missing record. Never equal to a rendered fingerprint.
pub const NO_CONFIGURATION: &str = "(no such configuration)";

/// Reads and rewrites the fingerprint record of one objects directory.
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    path: PathBuf,
}

impl FingerprintStore {
    pub fn new(objects_dir: &Path) -> Self {
        Self {
            path: objects_dir.join(FINGERPRINT_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last stored fingerprint, or [`NO_CONFIGURATION`].
    pub fn load(&self) -> io::Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(NO_CONFIGURATION.to_string()),
            Err(e) => Err(e),
        }
    }

    /// Compare `configuration` with the record and overwrite the record.
    ///
    /// Returns true when the configuration changed. The record is written on
    /// every call, changed or not.
    pub fn check_and_update(&self, configuration: &Configuration) -> io::Result<bool> {
        let previous = self.load()?;
        let current = configuration.fingerprint();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, &current)?;

        let changed = previous != current;
        if changed {
            info!(record = %self.path.display(), "configuration changed, analyzing every source");
        } else {
            debug!(record = %self.path.display(), "configuration unchanged");
        }
        Ok(changed)
    }
}
