//! SDK discovery inside an Xcode installation.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::env::BuildEnv;

/// Platforms searched for SDKs. Simulators come last so their SDKs win
/// over device SDKs sharing a name.
const PLATFORMS: &[&str] = &["AppleTVSimulator", "MacOSX", "WatchSimulator", "iPhoneSimulator"];

/// Developer directory of the active Xcode.
///
/// Uses `DEVELOPER_DIR` when set, `xcode-select -p` otherwise.
pub fn developer_dir(env: &BuildEnv) -> io::Result<PathBuf> {
    if let Some(dir) = env.get("DEVELOPER_DIR").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let output = Command::new("xcode-select").arg("-p").output()?;
    if !output.status.success() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "xcode-select -p failed; is Xcode installed?",
        ));
    }
    Ok(PathBuf::from(String::from_utf8_lossy(&output.stdout).trim()))
}

/// Map of lower-cased SDK name (e.g. `iphonesimulator9.3`) to SDK path.
///
/// `macosx` is aliased to the newest versioned macOS SDK when Xcode does not
/// ship an unversioned one.
pub fn sdk_paths(developer_dir: &Path) -> BTreeMap<String, PathBuf> {
    let mut paths = BTreeMap::new();

    for platform in PLATFORMS {
        let sdks_dir = developer_dir
            .join("Platforms")
            .join(format!("{}.platform", platform))
            .join("Developer")
            .join("SDKs");

        let Ok(entries) = fs::read_dir(&sdks_dir) else {
            continue;
        };
        let mut sdks: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "sdk"))
            .collect();
        sdks.sort();

        for sdk in sdks {
            if let Some(stem) = sdk.file_stem() {
                paths.insert(stem.to_string_lossy().to_lowercase(), sdk);
            }
        }
    }

    if !paths.contains_key("macosx") {
        let latest = paths
            .iter()
            .filter(|(name, _)| {
                name.strip_prefix("macosx")
                    .and_then(|rest| rest.chars().next())
                    .is_some_and(|c| c.is_ascii_digit())
            })
            .map(|(_, path)| path.clone())
            .last();
        if let Some(path) = latest {
            paths.insert("macosx".to_string(), path);
        }
    }

    paths
}

/// Path of the SDK called `name`.
pub fn sdk_path(name: &str, developer_dir: &Path) -> Option<PathBuf> {
    sdk_paths(developer_dir).remove(&name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn xcode() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let xcode = dir.path().join("xcode");
        for sdk in [
            "Platforms/MacOSX.platform/Developer/SDKs/MacOSX10.11.sdk",
            "Platforms/iPhoneSimulator.platform/Developer/SDKs/iPhoneSimulator.sdk",
            "Platforms/iPhoneSimulator.platform/Developer/SDKs/iPhoneSimulator9.3.sdk",
            "Platforms/Unknown.platform/Developer/SDKs/unknown.sdk",
        ] {
            fs::create_dir_all(xcode.join(sdk)).unwrap();
        }
        (dir, xcode)
    }

    #[test]
    fn test_sdk_paths() {
        let (_dir, xcode) = xcode();
        let paths = sdk_paths(&xcode);

        assert_eq!(
            paths["iphonesimulator"],
            xcode.join("Platforms/iPhoneSimulator.platform/Developer/SDKs/iPhoneSimulator.sdk")
        );
        assert_eq!(
            paths["iphonesimulator9.3"],
            xcode.join("Platforms/iPhoneSimulator.platform/Developer/SDKs/iPhoneSimulator9.3.sdk")
        );
        let macosx = xcode.join("Platforms/MacOSX.platform/Developer/SDKs/MacOSX10.11.sdk");
        assert_eq!(paths["macosx"], macosx, "macosx is alias");
        assert_eq!(paths["macosx10.11"], macosx);

        assert!(!paths.contains_key("appletvos"));
        assert!(!paths.contains_key("unknown"));
    }

    #[test]
    fn test_sdk_path_by_name() {
        let (_dir, xcode) = xcode();
        assert_eq!(
            sdk_path("iPhoneSimulator", &xcode),
            Some(xcode.join("Platforms/iPhoneSimulator.platform/Developer/SDKs/iPhoneSimulator.sdk"))
        );
        assert_eq!(sdk_path("watchos", &xcode), None);
    }

    #[test]
    fn test_developer_dir_from_env() {
        let env = BuildEnv::from_pairs([("DEVELOPER_DIR", "/Applications/Xcode.app/Contents/Developer")]);
        assert_eq!(
            developer_dir(&env).unwrap(),
            PathBuf::from("/Applications/Xcode.app/Contents/Developer")
        );
    }
}
