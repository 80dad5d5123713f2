//! Test fixtures: a throwaway Xcode-style project layout plus fake analyzers.
//!
//! Layout under the temp dir:
//! - `analyzer`, `resource_dir/`
//! - `TestProgram/TestProgram.xcodeproj/`
//! - `TestProgram/TestProgram/{ViewController,AppDelegate,main}.m`
//! - `TestProgram/nullarihyon.toml` listing the target's sources
//! - `build/Debug-iphonesimulator/TestProgram.build/Objects-normal/x86_64/`

#![allow(dead_code)]

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use nullarihyon::{AnalyzerOutput, AnalyzerRunner, BuildEnv, XcodeRequest};
use tempfile::TempDir;

pub const SOURCES: &[&str] = &["ViewController", "AppDelegate", "main"];

/// 2016-04-01T00:00:00Z
pub fn april_first() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_459_468_800)
}

pub fn days(n: u64) -> Duration {
    Duration::from_secs(n * 86_400)
}

/// Create `path` if needed and set its modification time.
pub fn touch(path: &Path, at: SystemTime) {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.set_modified(at).unwrap();
}

pub fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path).unwrap().modified().unwrap()
}

pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let project = Self { dir };

        fs::write(project.analyzer_path(), "").unwrap();
        fs::create_dir_all(project.resource_dir_path()).unwrap();
        fs::create_dir_all(project.project_path()).unwrap();
        fs::create_dir_all(project.sdk_root()).unwrap();
        fs::create_dir_all(project.objects_dir()).unwrap();

        let source_dir = project.project_dir().join("TestProgram");
        fs::create_dir_all(&source_dir).unwrap();
        for name in SOURCES {
            fs::write(source_dir.join(format!("{name}.m")), "@import Foundation;\n").unwrap();
        }

        project.write_settings("");
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn analyzer_path(&self) -> PathBuf {
        self.root().join("analyzer")
    }

    pub fn resource_dir_path(&self) -> PathBuf {
        self.root().join("resource_dir")
    }

    pub fn project_dir(&self) -> PathBuf {
        self.root().join("TestProgram")
    }

    pub fn project_path(&self) -> PathBuf {
        self.project_dir().join("TestProgram.xcodeproj")
    }

    pub fn sdk_root(&self) -> PathBuf {
        self.root()
            .join("xcode/Platforms/iPhoneSimulator.platform/Developer/SDKs/iPhoneSimulator9.3.sdk")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root().join("build/Debug-iphonesimulator")
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.build_dir().join("TestProgram.build/Objects-normal/x86_64")
    }

    pub fn source(&self, name: &str) -> PathBuf {
        self.project_dir().join("TestProgram").join(format!("{name}.m"))
    }

    pub fn object(&self, name: &str) -> PathBuf {
        self.objects_dir().join(format!("{name}.o"))
    }

    pub fn cached_result(&self, name: &str) -> PathBuf {
        self.objects_dir().join(format!("{name}.null"))
    }

    pub fn fingerprint_record(&self) -> PathBuf {
        self.objects_dir().join("nullarihyon.config")
    }

    /// Write `nullarihyon.toml` with the target table plus `extra`.
    pub fn write_settings(&self, extra: &str) {
        let sources: Vec<String> = SOURCES
            .iter()
            .map(|name| format!("\"TestProgram/{name}.m\""))
            .collect();
        let contents = format!(
            "{extra}\n[targets.TestProgram]\nsources = [{}]\n",
            sources.join(", ")
        );
        fs::write(self.project_dir().join("nullarihyon.toml"), contents).unwrap();
    }

    pub fn env(&self) -> BuildEnv {
        BuildEnv::from_pairs([
            ("PROJECT_FILE_PATH", self.project_path().display().to_string()),
            ("TARGETNAME", "TestProgram".to_string()),
            ("SDKROOT", self.sdk_root().display().to_string()),
            ("CLANG_ENABLE_MODULES", "NO".to_string()),
            ("CLANG_ENABLE_OBJC_ARC", "YES".to_string()),
            ("FRAMEWORK_SEARCH_PATHS", "/path/to/Frameworks \"/another/path/to/Frameworks\"".to_string()),
            ("HEADER_SEARCH_PATHS", "/path/to/include \"/another/path/to/include\"".to_string()),
            ("OTHER_CFLAGS", "-iquote /some/directory -isystem /another/directory".to_string()),
            (
                "OBJECT_FILE_DIR_normal",
                self.build_dir().join("TestProgram.build/Objects-normal").display().to_string(),
            ),
            ("arch", "x86_64".to_string()),
            ("variant", "normal".to_string()),
        ])
    }

    pub fn request(&self, jobs: usize) -> XcodeRequest {
        XcodeRequest {
            analyzer_path: self.analyzer_path(),
            resource_dir_path: self.resource_dir_path(),
            jobs: Some(jobs),
            ..Default::default()
        }
    }

    /// Objects older than their sources' cached results.
    pub fn touch_objects(&self, at: SystemTime) {
        for name in SOURCES {
            touch(&self.object(name), at);
        }
    }
}

/// Fake analyzer recording every command line it receives.
pub struct RecordingRunner {
    pub calls: Mutex<Vec<Vec<String>>>,
    exit_code: i32,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::exiting_with(0)
    }

    pub fn exiting_with(exit_code: i32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            exit_code,
        }
    }

    /// Sources the analyzer was run for, sorted.
    pub fn analyzed(&self) -> Vec<PathBuf> {
        let mut sources: Vec<PathBuf> = self
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|call| PathBuf::from(&call[1]))
            .collect();
        sources.sort();
        sources
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl AnalyzerRunner for RecordingRunner {
    fn run(&self, command_line: &[String]) -> io::Result<AnalyzerOutput> {
        self.calls.lock().unwrap().push(command_line.to_vec());
        Ok(AnalyzerOutput {
            text: format!("Check result for {}\n", command_line[1]),
            exit_code: Some(self.exit_code),
            timed_out: false,
        })
    }
}

/// Fake analyzer killed after printing part of its output.
pub struct TimingOutRunner;

impl AnalyzerRunner for TimingOutRunner {
    fn run(&self, _command_line: &[String]) -> io::Result<AnalyzerOutput> {
        Ok(AnalyzerOutput {
            text: "partial\n".to_string(),
            exit_code: None,
            timed_out: true,
        })
    }
}

/// Fake analyzer that can never be started.
pub struct MissingRunner;

impl AnalyzerRunner for MissingRunner {
    fn run(&self, _command_line: &[String]) -> io::Result<AnalyzerOutput> {
        Err(io::Error::new(io::ErrorKind::NotFound, "No such file or directory"))
    }
}

pub fn sorted(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort();
    paths
}
