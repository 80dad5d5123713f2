//! Analyzer invocation.
//!
//! The analyzer is a black box: it gets a command line and produces text and
//! an exit status. [`AnalyzerRunner`] is the seam the dispatcher calls, so
//! tests can substitute a recording runner for the real process.

use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::fcntl::{self, FcntlArg, FdFlag};
use nix::sys::signal::{self, Signal};
use nix::unistd::{self, Pid};
use tracing::{debug, warn};

/// Captured result of one analyzer invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalyzerOutput {
    /// Combined stdout and stderr.
    pub text: String,
    /// Exit code; `None` when killed by a signal or timed out.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl AnalyzerOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs the analyzer for a rendered command line.
///
/// `command_line[0]` is the executable. An `Err` means the process could not
/// be started at all; a failing analyzer is an `Ok` with a non-zero exit code.
pub trait AnalyzerRunner: Send + Sync {
    fn run(&self, command_line: &[String]) -> io::Result<AnalyzerOutput>;
}

/// Runs the analyzer as a child process.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill analyzer processes running longer than `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

/// Read the shared output pipe to EOF.
///
/// EOF arrives once every process holding the write end has exited, which
/// includes grandchildren the analyzer spawned.
fn read_output(reader: File) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut reader = reader;
        let mut bytes = Vec::new();
        let _ = reader.read_to_end(&mut bytes);
        bytes
    })
}

/// Pipe whose ends are not inherited by analyzers other workers start.
fn cloexec_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let (read_end, write_end) = unistd::pipe()?;
    for fd in [&read_end, &write_end] {
        fcntl::fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read_end, write_end))
}

/// Kill the analyzer's process group, so helpers it started go too.
fn kill_group(child: &mut Child) {
    let pgid = Pid::from_raw(child.id() as i32);
    if signal::killpg(pgid, Signal::SIGKILL).is_err() {
        let _ = child.kill();
    }
}

impl AnalyzerRunner for ProcessRunner {
    fn run(&self, command_line: &[String]) -> io::Result<AnalyzerOutput> {
        let (program, args) = command_line
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;

        // stdout and stderr share one pipe so lines keep the order the
        // analyzer wrote them in.
        let (read_end, write_end) = cloexec_pipe()?;
        let mut child = {
            let mut command = Command::new(program);
            command
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::from(write_end.try_clone()?))
                .stderr(Stdio::from(write_end))
                .process_group(0);
            command.spawn()?
        };
        let reader = read_output(File::from(read_end));

        let started = Instant::now();
        let mut timed_out = false;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if self.timeout.is_some_and(|limit| started.elapsed() >= limit) {
                warn!(program = %program, "analyzer timed out, killing its process group");
                kill_group(&mut child);
                timed_out = true;
                break child.wait()?;
            }
            thread::sleep(Duration::from_millis(20));
        };

        let bytes = reader.join().unwrap_or_default();
        let text = String::from_utf8_lossy(&bytes).into_owned();

        debug!(program = %program, code = ?status.code(), elapsed_ms = started.elapsed().as_millis() as u64, "analyzer finished");

        Ok(AnalyzerOutput {
            text,
            exit_code: if timed_out { None } else { status.code() },
            timed_out,
        })
    }
}
