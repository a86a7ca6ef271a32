#![warn(missing_docs)]
//! # qmlbench
//!
//! Process-isolated benchmark harness for QML scenes.
//!
//! Every benchmark runs in its own worker process, started from the same
//! executable with a hidden marker flag:
//! - **Crash isolation**: a crashing scene loses only its own result
//! - **Hang detection**: a worker exceeding the hang timeout is killed and the
//!   run is marked failed
//! - **Structured output**: with `--json`, each worker's result object is
//!   merged into one document keyed by benchmark
//!
//! ## Quick Start
//!
//! ```ignore
//! use qmlbench::prelude::*;
//!
//! struct Renderer;
//!
//! impl SceneRunner for Renderer {
//!     fn run(&mut self, benchmark: &Benchmark, options: &Options)
//!         -> Result<Map<String, Value>, WorkerError> {
//!         // load benchmark.input into a window of options.window_size ...
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     qmlbench::run(&mut Renderer)
//! }
//! ```

// Re-export core types
pub use qmlbench_core::{
    BaseInvocation, Benchmark, DiscoveryError, Options, OutputMode, SUBPROCESS_FLAG, SceneRunner,
    ShellTemplate, WindowSize, WorkerError, WorkerInvocation, discover_benchmarks,
};

// Re-export orchestration
pub use qmlbench_cli::{
    AggregateResults, Cli, Launcher, MergeError, OnHang, QmlbenchConfig, RunCoordinator,
    RunOutcome, RunStatus, Supervisor, SupervisorError, TerminalStatus, WorkerOutput,
};

// Re-export report types
pub use qmlbench_report::{BenchmarkOutcome, OutcomeStatus, Report, ResultSet};

/// Prelude for scene runner binaries
pub mod prelude {
    pub use crate::{Benchmark, Options, SceneRunner, ShellTemplate, WorkerError};
    pub use serde_json::{Map, Value, json};
}

/// Run the qmlbench harness.
///
/// Call this from the scene runner binary's `main()`:
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     qmlbench::run(&mut MyRunner)
/// }
/// ```
pub use qmlbench_cli::run;
