//! Run Coordinator
//!
//! Drives every benchmark through a worker process, strictly one after the
//! other, and collects both the merged results and a per-benchmark outcome.
//!
//! A hung worker marks the whole run failed; crashes, spawn failures and
//! unparseable output are reported but never change the run status.

use crate::config::OnHang;
use crate::merger::AggregateResults;
use crate::supervisor::{Launcher, SupervisorError, TerminalStatus, WorkerOutput};
use indicatif::{ProgressBar, ProgressStyle};
use qmlbench_core::{BaseInvocation, Benchmark, OutputMode};
use qmlbench_report::{BenchmarkOutcome, OutcomeStatus};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Overall result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    /// No worker hung
    #[default]
    Ok,
    /// At least one worker hung
    Failed,
}

impl RunStatus {
    /// Process exit code for this status
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Ok => 0,
            RunStatus::Failed => 1,
        }
    }

    /// Whether the run failed
    pub fn is_failed(self) -> bool {
        self == RunStatus::Failed
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final run status
    pub status: RunStatus,
    /// Results merged from structured workers
    pub results: AggregateResults,
    /// One outcome per benchmark, in run order
    pub outcomes: Vec<BenchmarkOutcome>,
    /// Wall-clock duration of the whole run
    pub duration: Duration,
}

/// Sequential benchmark runner
pub struct RunCoordinator<L: Launcher> {
    launcher: L,
    base: BaseInvocation,
    mode: OutputMode,
    on_hang: OnHang,
    progress: Option<ProgressBar>,
}

impl<L: Launcher> RunCoordinator<L> {
    /// Create a coordinator launching workers through `launcher`
    pub fn new(launcher: L, base: BaseInvocation, mode: OutputMode) -> Self {
        Self {
            launcher,
            base,
            mode,
            on_hang: OnHang::default(),
            progress: None,
        }
    }

    /// Set what happens to the remaining benchmarks after a hang
    pub fn with_on_hang(mut self, on_hang: OnHang) -> Self {
        self.on_hang = on_hang;
        self
    }

    /// Report progress on `progress` while running
    pub fn with_progress(mut self, progress: Option<ProgressBar>) -> Self {
        self.progress = progress;
        self
    }

    /// Borrow the launcher
    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Run every benchmark in order
    pub fn run(&mut self, benchmarks: &[Benchmark]) -> RunOutcome {
        let started = Instant::now();
        let mut status = RunStatus::Ok;
        let mut results = AggregateResults::new();
        let mut outcomes = Vec::with_capacity(benchmarks.len());
        let mut skip_rest = false;

        if let Some(pb) = &self.progress {
            pb.set_length(benchmarks.len() as u64);
        }

        for benchmark in benchmarks {
            if let Some(pb) = &self.progress {
                pb.set_message(benchmark.name().to_string());
            }

            let outcome = if skip_rest {
                debug!(benchmark = %benchmark.id, "Skipping benchmark after hang");
                BenchmarkOutcome {
                    benchmark: benchmark.id.clone(),
                    status: OutcomeStatus::Skipped,
                    exit_code: None,
                    duration_ms: 0.0,
                    detail: None,
                }
            } else {
                let outcome = self.run_one(benchmark, &mut results);
                if outcome.status == OutcomeStatus::TimedOut {
                    status = RunStatus::Failed;
                    if self.on_hang == OnHang::SkipRemaining {
                        skip_rest = true;
                    }
                }
                outcome
            };
            outcomes.push(outcome);

            if let Some(pb) = &self.progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }

        let duration = started.elapsed();
        info!(
            benchmarks = benchmarks.len(),
            recorded = results.len(),
            failed = status.is_failed(),
            elapsed_ms = duration.as_millis() as u64,
            "Run finished"
        );

        RunOutcome {
            status,
            results,
            outcomes,
            duration,
        }
    }

    fn run_one(&mut self, benchmark: &Benchmark, results: &mut AggregateResults) -> BenchmarkOutcome {
        let invocation = self.base.for_benchmark(benchmark);
        debug!(benchmark = %benchmark.id, "Launching worker");
        let launched = Instant::now();

        let output = match self.launcher.launch(&invocation) {
            Ok(output) => output,
            Err(e) => {
                let status = match e {
                    SupervisorError::SpawnFailed { .. } => {
                        warn!(benchmark = %benchmark.id, error = %e, "Failed to start worker");
                        OutcomeStatus::SpawnFailed
                    }
                    SupervisorError::Wait(_) => {
                        warn!(benchmark = %benchmark.id, error = %e, "Lost track of worker");
                        OutcomeStatus::WaitFailed
                    }
                };
                return BenchmarkOutcome {
                    benchmark: benchmark.id.clone(),
                    status,
                    exit_code: None,
                    duration_ms: launched.elapsed().as_secs_f64() * 1000.0,
                    detail: Some(e.to_string()),
                };
            }
        };

        let mut outcome = BenchmarkOutcome {
            benchmark: benchmark.id.clone(),
            status: OutcomeStatus::Completed,
            exit_code: None,
            duration_ms: output.elapsed.as_secs_f64() * 1000.0,
            detail: output.reader_failure.clone(),
        };

        match output.status {
            TerminalStatus::TimedOut => {
                error!(
                    "Aborting test run, as this probably means benchmark setup is screwed up or the hardware needs resetting!"
                );
                outcome.status = OutcomeStatus::TimedOut;
                return outcome;
            }
            TerminalStatus::Crashed => outcome.status = OutcomeStatus::Crashed,
            TerminalStatus::Exited(code) => outcome.exit_code = Some(code),
        }

        if self.mode.is_structured() {
            self.merge_output(benchmark, &output, results, &mut outcome);
        }
        outcome
    }

    fn merge_output(
        &self,
        benchmark: &Benchmark,
        output: &WorkerOutput,
        results: &mut AggregateResults,
        outcome: &mut BenchmarkOutcome,
    ) {
        let crashed = output.status == TerminalStatus::Crashed;

        if output.structured_stdout.is_empty() {
            if !crashed {
                warn!(benchmark = %benchmark.id, "Worker produced no result");
                outcome.status = OutcomeStatus::NoOutput;
            }
            return;
        }

        match results.merge(&benchmark.id, &output.structured_stdout) {
            Ok(()) => {
                debug!(benchmark = %benchmark.id, "Result recorded");
                if crashed {
                    outcome.detail.get_or_insert_with(|| "result recorded before crash".to_string());
                } else {
                    outcome.status = OutcomeStatus::Recorded;
                }
            }
            Err(e) => {
                warn!(benchmark = %benchmark.id, error = %e, "Can't parse JSON for result");
                if !crashed {
                    outcome.status = OutcomeStatus::InvalidOutput;
                }
                outcome.detail = Some(e.to_string());
            }
        }
    }
}

/// Progress bar for structured runs, drawn on stderr
pub fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}
