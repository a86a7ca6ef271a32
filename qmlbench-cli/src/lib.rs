#![warn(missing_docs)]
//! qmlbench CLI Library
//!
//! Command line front end and parent-side orchestration for qmlbench. A scene
//! runner binary calls [`run`] from `main`; the same executable then acts as
//! the parent (discovering benchmarks and supervising one worker process per
//! benchmark) or, when started with the hidden marker flag, as a worker.
//!
//! # Example
//!
//! ```ignore
//! struct MyRunner;
//!
//! impl qmlbench_core::SceneRunner for MyRunner {
//!     fn run(&mut self, benchmark: &Benchmark, options: &Options)
//!         -> Result<serde_json::Map<String, serde_json::Value>, WorkerError> {
//!         // render the scene and measure it
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     qmlbench_cli::run(&mut MyRunner)
//! }
//! ```

mod classifier;
mod config;
mod coordinator;
mod merger;
mod metadata;
mod supervisor;

pub use classifier::*;
pub use config::*;
pub use coordinator::*;
pub use merger::*;
pub use metadata::{REPORT_SCHEMA_VERSION, build_report_meta};
pub use supervisor::*;

use clap::Parser;
use qmlbench_core::{
    BaseInvocation, Benchmark, DEFAULT_WINDOW_SIZE, Options, OutputMode, SUBPROCESS_FLAG,
    SceneRunner, ShellTemplate, WindowSize, WorkerMain, discover_benchmarks,
};
use qmlbench_report::{Report, format_human_summary, generate_json_report};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// qmlbench command line arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "qmlbench")]
#[command(version, about = "Benchmark QML scenes in isolated worker processes")]
#[command(allow_negative_numbers = true)]
pub struct Cli {
    /// Verbose mode
    #[arg(short, long)]
    pub verbose: bool,

    /// Identifier recorded in the JSON output
    #[arg(long, value_name = "identifier", default_value = "")]
    pub id: String,

    /// Output results as a single JSON document
    #[arg(long)]
    pub json: bool,

    /// Number of times to repeat each benchmark
    #[arg(long, value_name = "iterations", default_value_t = 5)]
    pub repeat: i64,

    /// Initial delay before benchmarks start, in milliseconds
    #[arg(long, value_name = "ms", default_value_t = 2000)]
    pub delay: u64,

    /// Window width
    #[arg(long, default_value_t = 800)]
    pub width: i64,

    /// Window height
    #[arg(long, default_value_t = 600)]
    pub height: i64,

    /// Frame rate measurement interval in milliseconds (at least 500)
    #[arg(long = "fps-interval", value_name = "ms", default_value_t = 1000.0)]
    pub fps_interval: f64,

    /// Tolerated deviation from the target frame rate in percent (at least 1)
    #[arg(long = "fps-tolerance", value_name = "pct", default_value_t = 2.0)]
    pub fps_tolerance: f64,

    /// Refresh rate to assume instead of the screen's
    #[arg(long = "fps-override", value_name = "fps")]
    pub fps_override: Option<f64>,

    /// Run benchmarks fullscreen
    #[arg(long)]
    pub fullscreen: bool,

    /// Benchmark shell: sustained-fps, static-count or frame-count
    #[arg(short, long, value_name = "template", default_value = "sustained-fps")]
    pub shell: String,

    /// Instance count for the count-based shells (-1 = benchmark default)
    #[arg(long, default_value_t = -1)]
    pub count: i64,

    /// Frame counting interval in milliseconds for the frame-count shell
    #[arg(long = "framecount-interval", value_name = "ms", default_value_t = 20000)]
    pub framecount_interval: u64,

    /// Multiplier applied to static counts for faster or slower hardware
    #[arg(long = "hardware-multiplier", default_value_t = 1.0)]
    pub hardware_multiplier: f64,

    /// Also write the JSON report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Internal: run as a worker process (used by the parent)
    #[arg(long = "silently-really-run-and-bypass-subprocess", hide = true)]
    pub worker: bool,

    /// QML files or directories to benchmark
    #[arg(value_name = "input", required = true)]
    pub inputs: Vec<PathBuf>,
}

impl Cli {
    /// Resolve the run options, applying lower bounds and fallbacks
    pub fn options(&self) -> Options {
        let shell = ShellTemplate::from_name(&self.shell);
        if shell.name() != self.shell {
            warn!(shell = %self.shell, "Unknown shell template, using {}", shell.name());
        }

        Options {
            id: self.id.clone(),
            verbose: self.verbose,
            mode: if self.json {
                OutputMode::Structured
            } else {
                OutputMode::Human
            },
            repeat: self.repeat.clamp(1, i64::from(u32::MAX)) as u32,
            delay_ms: self.delay,
            window_size: WindowSize::new(self.width, self.height).unwrap_or(DEFAULT_WINDOW_SIZE),
            fullscreen: self.fullscreen,
            fps_interval_ms: self.fps_interval,
            fps_tolerance: self.fps_tolerance,
            fps_override: self.fps_override.filter(|fps| *fps > 0.0),
            shell,
            count: self.count,
            frame_count_interval_ms: self.framecount_interval,
            hardware_multiplier: self.hardware_multiplier,
        }
        .clamped()
    }

    /// Positional inputs exactly as given on the command line
    pub fn positionals(&self) -> Vec<OsString> {
        self.inputs
            .iter()
            .map(|p| p.clone().into_os_string())
            .collect()
    }
}

/// Run qmlbench with the process arguments.
///
/// Exits the process with code 1 when a worker hung.
pub fn run<R: SceneRunner>(runner: &mut R) -> anyhow::Result<()> {
    let args: Vec<OsString> = std::env::args_os().collect();
    let cli = Cli::parse_from(&args);
    let status = run_with_cli(&cli, &args, runner)?;
    if status.is_failed() {
        std::process::exit(status.exit_code());
    }
    Ok(())
}

/// Run qmlbench with pre-parsed arguments.
///
/// `args` is the raw argument vector `cli` was parsed from; the parent
/// forwards it to every worker.
pub fn run_with_cli<R: SceneRunner>(
    cli: &Cli,
    args: &[OsString],
    runner: &mut R,
) -> anyhow::Result<RunStatus> {
    init_logging(cli.verbose);

    if cli.worker {
        run_worker_mode(cli, &cli.options(), runner)?;
        return Ok(RunStatus::Ok);
    }

    run_parent_mode(cli, args)
}

/// Install the tracing subscriber on stderr; stdout is reserved for results
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        "qmlbench=debug"
    } else {
        "qmlbench=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run as a worker process
fn run_worker_mode<R: SceneRunner>(
    cli: &Cli,
    options: &Options,
    runner: &mut R,
) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    WorkerMain::new(runner, options)
        .run(&cli.inputs, &mut out)
        .map_err(|e| anyhow::anyhow!("Worker error: {}", e))
}

fn run_parent_mode(cli: &Cli, args: &[OsString]) -> anyhow::Result<RunStatus> {
    let config = QmlbenchConfig::discover()?;
    let program = std::env::current_exe()?;
    run_parent(cli, args, program, &config)
}

/// Run the parent side: discover inputs, run one `program` worker per
/// benchmark, then print the report and write it where requested.
///
/// `args` is the raw argument vector `cli` was parsed from.
pub fn run_parent(
    cli: &Cli,
    args: &[OsString],
    program: impl Into<PathBuf>,
    config: &QmlbenchConfig,
) -> anyhow::Result<RunStatus> {
    let options = cli.options();
    let hang_timeout = config.hang_timeout()?;

    let benchmarks = discover_benchmarks(&cli.inputs)?;
    if benchmarks.is_empty() {
        warn!("No benchmarks found");
    }

    if options.verbose && !options.is_structured() {
        print!("{}", settings_banner(&options, &benchmarks));
    }

    let base = BaseInvocation::new(program, args, &cli.positionals());
    debug!(
        flag = SUBPROCESS_FLAG,
        forwarded = base.args().len() - 1,
        timeout_ms = hang_timeout.as_millis() as u64,
        "Prepared worker invocation"
    );

    let progress = options.is_structured().then(progress_bar);
    let sink: Arc<dyn OutputSink> = Arc::new(ConsoleSink::new(progress.clone()));
    let supervisor = Supervisor::new(options.mode, sink).with_hang_timeout(hang_timeout);

    info!(benchmarks = benchmarks.len(), "Running benchmarks");
    let mut coordinator = RunCoordinator::new(supervisor, base, options.mode)
        .with_on_hang(config.runner.on_hang)
        .with_progress(progress);
    let outcome = coordinator.run(&benchmarks);

    let report = build_report(&options, &outcome);
    emit_report(&report, options.mode)?;

    let report_path = cli
        .output
        .clone()
        .or_else(|| config.output.report_path.as_ref().map(PathBuf::from));
    if let Some(path) = report_path {
        write_report(&report, &path)?;
        info!(path = %path.display(), "Report written");
    }

    Ok(outcome.status)
}

/// Assemble the final report of a run
pub fn build_report(options: &Options, outcome: &RunOutcome) -> Report {
    Report::new(
        build_report_meta(options),
        outcome.results.as_map().clone(),
        outcome.outcomes.clone(),
        outcome.duration.as_secs_f64() * 1000.0,
    )
}

/// Print the report on stdout: one JSON document, or the human summary
pub fn emit_report(report: &Report, mode: OutputMode) -> anyhow::Result<()> {
    let text = match mode {
        OutputMode::Structured => generate_json_report(report)?,
        OutputMode::Human => format_human_summary(report),
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", text)?;
    out.flush()?;
    Ok(())
}

/// Write the JSON report to `path`, creating parent directories
pub fn write_report(report: &Report, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, generate_json_report(report)?)
        .map_err(|e| anyhow::anyhow!("Failed to write report {}: {}", path.display(), e))
}

/// Settings printed before a verbose human run
pub fn settings_banner(options: &Options, benchmarks: &[Benchmark]) -> String {
    let mut output = String::new();
    output.push_str("Settings:\n");
    match options.fps_override {
        Some(fps) => output.push_str(&format!("    Frame rate: {} (override)\n", fps)),
        None => output.push_str("    Frame rate: screen default\n"),
    }
    output.push_str(&format!("    Fullscreen: {}\n", options.fullscreen));
    output.push_str(&format!("    Window size: {}\n", options.window_size));
    output.push_str(&format!("    Fps interval: {} ms\n", options.fps_interval_ms));
    output.push_str(&format!("    Fps tolerance: {}%\n", options.fps_tolerance));
    output.push_str(&format!("    Repetitions: {}\n", options.repeat));
    output.push_str(&format!(
        "    Template: {} ({})\n",
        options.shell.name(),
        options.shell.resource()
    ));
    output.push_str(&format!("Benchmarks ({}):\n", benchmarks.len()));
    for benchmark in benchmarks {
        output.push_str(&format!("    {}\n", benchmark.id));
    }
    output.push('\n');
    output
}
