#![warn(missing_docs)]
//! qmlbench Core - Benchmark Model and Worker Runtime
//!
//! This crate holds everything both sides of the parent/worker split agree on:
//! - `Benchmark` identifiers and their resolved inputs
//! - `Options`, the explicit run configuration handed to every component
//! - Input discovery (files and directories of `.qml` scenes)
//! - Worker invocation construction (marker flag + forwarded flags + one input)
//! - The worker entry point that drives a `SceneRunner` and emits its result

mod benchmark;
mod discovery;
mod invocation;
mod options;
mod worker;

pub use benchmark::Benchmark;
pub use discovery::{DiscoveryError, discover_benchmarks};
pub use invocation::{BaseInvocation, SUBPROCESS_FLAG, WorkerInvocation};
pub use options::{DEFAULT_WINDOW_SIZE, Options, OutputMode, ShellTemplate, WindowSize};
pub use worker::{SceneRunner, WorkerError, WorkerMain, format_result_text};

/// File extension of benchmark scenes
pub const SCENE_EXTENSION: &str = "qml";
