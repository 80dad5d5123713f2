//! Staleness oracle.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

fn file_mtime(path: &Path) -> Option<SystemTime> {
    let meta = fs::metadata(path).ok()?;
    if !meta.is_file() {
        return None;
    }
    meta.modified().ok()
}

/// Decide whether a source needs analysis.
///
/// True when forced, when the object file is missing (the source did not
/// compile), when no result is cached, or when the object file is newer than
/// the cached result. Equal timestamps count as fresh.
pub fn needs_check(object_path: &Path, result_path: &Path, force: bool) -> bool {
    if force {
        return true;
    }

    let Some(object_mtime) = file_mtime(object_path) else {
        return true;
    };
    let Some(result_mtime) = file_mtime(result_path) else {
        return true;
    };

    result_mtime < object_mtime
}
