//! nullarihyon CLI
//!
//! Entry point for the `nullarihyon` command-line tool.

use clap::{Parser, Subcommand};
use colored::Colorize;
use nullarihyon::env::EnvError;
use nullarihyon::{
    sdk, AnalyzerRunner, BuildEnv, Configuration, DriverError, ProcessRunner, RunSummary, XcodeRequest,
    XcodeRun,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nullarihyon")]
#[command(about = "Nullability analysis for Objective-C projects", version)]
struct Cli {
    /// Log decisions of the dispatcher to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the current target (run from an Xcode "Run Script" phase)
    Xcode {
        /// Path to analyzer executable
        #[arg(long, env = "NULLARIHYON_ANALYZER")]
        analyzer: PathBuf,

        /// Path passed as -resource-dir
        #[arg(long, env = "NULLARIHYON_RESOURCE_DIR")]
        resource_dir: PathBuf,

        /// Number of concurrent analyzer processes
        #[arg(long, short = 'j')]
        jobs: Option<usize>,

        /// Do not print results of sources which are not updated
        #[arg(long)]
        only_latest: bool,

        /// Pass -debug to the analyzer
        #[arg(long)]
        debug: bool,

        /// Path to settings file (default: nullarihyon.toml beside the project)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Write the run summary as JSON to this path
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Run analyzer for FILE...
    Check {
        /// Path to analyzer executable
        #[arg(long, env = "NULLARIHYON_ANALYZER")]
        analyzer: PathBuf,

        /// Path passed as -resource-dir
        #[arg(long, env = "NULLARIHYON_RESOURCE_DIR")]
        resource_dir: PathBuf,

        /// Name of SDK (used for -isysroot)
        #[arg(long)]
        sdk: Option<String>,

        /// Path to SDK (passed as -isysroot, overrides --sdk)
        #[arg(long)]
        sdk_path: Option<PathBuf>,

        /// Other clang flags for the analyzer
        #[arg(long = "flag", allow_hyphen_values = true)]
        flags: Vec<String>,

        /// Disable ARC
        #[arg(long)]
        no_arc: bool,

        /// Disable modules
        #[arg(long)]
        no_modules: bool,

        /// Keep NSAssert family enabled
        #[arg(long)]
        no_block_assertions: bool,

        /// Source files to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List SDKs of the active Xcode
    Sdks,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Xcode {
            analyzer,
            resource_dir,
            jobs,
            only_latest,
            debug,
            settings,
            summary,
        } => {
            let request = XcodeRequest {
                analyzer_path: analyzer,
                resource_dir_path: resource_dir,
                jobs,
                only_latest,
                debug,
                settings_path: settings,
            };
            run_xcode(&request, summary.as_deref());
        }
        Commands::Check {
            analyzer,
            resource_dir,
            sdk,
            sdk_path,
            flags,
            no_arc,
            no_modules,
            no_block_assertions,
            files,
        } => {
            let mut config = match Configuration::new(&analyzer, &resource_dir) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            };
            config.set_arc_enabled(!no_arc);
            config.set_modules_enabled(!no_modules);
            config.set_assertions_blocked(!no_block_assertions);
            config.set_sysroot_path(resolve_sysroot(sdk.as_deref(), sdk_path));
            for flag in flags {
                config.add_other_flag(flag);
            }
            run_check(&config, &files);
        }
        Commands::Sdks => run_sdks(),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "nullarihyon=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run_xcode(request: &XcodeRequest, summary_path: Option<&Path>) {
    let env = BuildEnv::from_process();

    let run = match XcodeRun::prepare(request, env) {
        Ok(run) => run,
        Err(DriverError::Env(EnvError::Missing(ref key)))
            if key == "PROJECT_FILE_PATH" || key == "TARGETNAME" =>
        {
            eprintln!("Start from Xcode \"Run Script Phase\"...");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let runner = ProcessRunner::with_timeout(run.timeout());
    // Each block goes out in a single write, so the shared handle is enough.
    let mut sink = io::stdout();

    match run.run(&runner, &mut sink) {
        Ok(summary) => {
            tracing::info!(
                analyzed = summary.analyzed,
                cached = summary.cached,
                skipped = summary.skipped,
                errors = summary.errors,
                forced = summary.forced,
                "analysis finished"
            );
            if let Some(path) = summary_path {
                if let Err(e) = write_summary(path, &summary) {
                    eprintln!("Error writing summary to {}: {}", path.display(), e);
                    process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json + "\n")
}

fn resolve_sysroot(sdk_name: Option<&str>, sdk_path: Option<PathBuf>) -> Option<PathBuf> {
    if sdk_path.is_some() {
        return sdk_path;
    }
    let name = sdk_name?;

    let developer_dir = match sdk::developer_dir(&BuildEnv::from_process()) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error locating Xcode: {}", e);
            process::exit(1);
        }
    };
    match sdk::sdk_path(name, &developer_dir) {
        Some(path) => Some(path),
        None => {
            let known: Vec<String> = sdk::sdk_paths(&developer_dir).into_keys().collect();
            eprintln!("Unknown SDK '{}'. Available SDKs: {}", name, known.join(", "));
            process::exit(1);
        }
    }
}

fn run_check(config: &Configuration, files: &[PathBuf]) {
    let runner = ProcessRunner::new();
    let mut failed = false;

    for file in files {
        let command_line = config.command_line(&[file]);
        println!("{}", command_line.join(" ").blue());

        match runner.run(&command_line) {
            Ok(output) => {
                print!("{}", output.text);
                let _ = io::stdout().flush();
            }
            Err(e) => {
                eprintln!("Failed to execute analyzer: {}", e);
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }
}

fn run_sdks() {
    let developer_dir = match sdk::developer_dir(&BuildEnv::from_process()) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error locating Xcode: {}", e);
            process::exit(1);
        }
    };

    let sdks = sdk::sdk_paths(&developer_dir);
    if sdks.is_empty() {
        println!("No SDKs found in {}", developer_dir.display());
        return;
    }
    for (name, path) in sdks {
        println!("  {:<24} {}", name, path.display());
    }
}
