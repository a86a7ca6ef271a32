//! Report Data Structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Benchmark identifier → unwrapped result object
pub type ResultSet = BTreeMap<String, Map<String, Value>>;

/// Complete run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Run and host metadata
    pub meta: ReportMeta,
    /// Merged worker results keyed by benchmark identifier
    pub results: ResultSet,
    /// One entry per benchmark, in run order
    pub outcomes: Vec<BenchmarkOutcome>,
    /// Counts derived from `outcomes`
    pub summary: ReportSummary,
}

impl Report {
    /// Assemble a report; the summary is derived from `outcomes`
    pub fn new(
        meta: ReportMeta,
        results: ResultSet,
        outcomes: Vec<BenchmarkOutcome>,
        total_duration_ms: f64,
    ) -> Self {
        let summary = ReportSummary::from_outcomes(&outcomes, total_duration_ms);
        Self {
            meta,
            results,
            outcomes,
            summary,
        }
    }
}

/// Report metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    /// Report layout version
    pub schema_version: u32,
    /// qmlbench version that produced the report
    pub version: String,
    /// Run identifier given with `--id` (may be empty)
    pub id: String,
    /// When the report was generated
    pub timestamp: DateTime<Utc>,
    /// Window size as `WIDTHxHEIGHT`
    pub window_size: String,
    /// Benchmark shell name
    pub shell: String,
    /// Host the run executed on
    pub system: SystemInfo,
}

/// System information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system name
    pub os: String,
    /// CPU architecture
    pub arch: String,
    /// CPU model name, "Unknown" when unavailable
    pub cpu: String,
    /// Available parallelism
    pub cpu_cores: u32,
    /// Total memory in GB, 0 when unavailable
    pub memory_gb: f64,
}

/// What happened to one benchmark's worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Worker exited; output was relayed (human mode)
    Completed,
    /// Worker's result was merged into the result set
    Recorded,
    /// Worker exited without writing anything to stdout
    NoOutput,
    /// Worker's stdout was not a single wrapped JSON object
    InvalidOutput,
    /// Worker terminated abnormally
    Crashed,
    /// Worker exceeded the hang timeout and was killed
    TimedOut,
    /// Worker could not be started
    SpawnFailed,
    /// Worker could not be observed after starting and was killed
    WaitFailed,
    /// Worker was never started because an earlier one hung
    Skipped,
}

impl OutcomeStatus {
    /// Status icon for terminal output
    pub fn icon(self) -> &'static str {
        match self {
            OutcomeStatus::Completed | OutcomeStatus::Recorded => "✓",
            OutcomeStatus::NoOutput | OutcomeStatus::InvalidOutput => "✗",
            OutcomeStatus::Crashed => "💥",
            OutcomeStatus::TimedOut => "⏱",
            OutcomeStatus::SpawnFailed | OutcomeStatus::WaitFailed => "✗",
            OutcomeStatus::Skipped => "⊘",
        }
    }
}

/// Per-benchmark outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkOutcome {
    /// Benchmark identifier
    pub benchmark: String,
    /// What happened
    pub status: OutcomeStatus,
    /// Exit code when the worker exited normally
    pub exit_code: Option<i32>,
    /// Worker wall-clock time
    pub duration_ms: f64,
    /// Diagnostic detail (parser error, spawn error, ...)
    pub detail: Option<String>,
}

/// Report summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Benchmarks in the run
    pub total_benchmarks: usize,
    /// Results merged into `results`
    pub recorded: usize,
    /// Workers that terminated abnormally
    pub crashed: usize,
    /// Workers killed after the hang timeout
    pub timed_out: usize,
    /// Workers that could not be started
    pub spawn_failed: usize,
    /// Workers lost after starting
    pub wait_failed: usize,
    /// Workers with missing or unparseable structured output
    pub invalid_output: usize,
    /// Benchmarks never started
    pub skipped: usize,
    /// True when at least one worker hung; the harness exits non-zero
    pub failed: bool,
    /// Wall-clock time of the whole run
    pub total_duration_ms: f64,
}

impl ReportSummary {
    /// Count outcomes by status
    pub fn from_outcomes(outcomes: &[BenchmarkOutcome], total_duration_ms: f64) -> Self {
        let count = |status: OutcomeStatus| outcomes.iter().filter(|o| o.status == status).count();
        let timed_out = count(OutcomeStatus::TimedOut);
        Self {
            total_benchmarks: outcomes.len(),
            recorded: count(OutcomeStatus::Recorded),
            crashed: count(OutcomeStatus::Crashed),
            timed_out,
            spawn_failed: count(OutcomeStatus::SpawnFailed),
            wait_failed: count(OutcomeStatus::WaitFailed),
            invalid_output: count(OutcomeStatus::InvalidOutput) + count(OutcomeStatus::NoOutput),
            skipped: count(OutcomeStatus::Skipped),
            failed: timed_out > 0,
            total_duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(benchmark: &str, status: OutcomeStatus) -> BenchmarkOutcome {
        BenchmarkOutcome {
            benchmark: benchmark.to_string(),
            status,
            exit_code: None,
            duration_ms: 0.0,
            detail: None,
        }
    }

    #[test]
    fn test_summary_counts() {
        let outcomes = vec![
            outcome("a", OutcomeStatus::Recorded),
            outcome("b", OutcomeStatus::Crashed),
            outcome("c", OutcomeStatus::InvalidOutput),
            outcome("d", OutcomeStatus::NoOutput),
            outcome("e", OutcomeStatus::Recorded),
        ];

        let summary = ReportSummary::from_outcomes(&outcomes, 12.5);
        assert_eq!(summary.total_benchmarks, 5);
        assert_eq!(summary.recorded, 2);
        assert_eq!(summary.crashed, 1);
        assert_eq!(summary.invalid_output, 2);
        assert!(!summary.failed);
    }

    #[test]
    fn test_timeout_marks_summary_failed() {
        let outcomes = vec![
            outcome("a", OutcomeStatus::TimedOut),
            outcome("b", OutcomeStatus::Skipped),
        ];

        let summary = ReportSummary::from_outcomes(&outcomes, 0.0);
        assert!(summary.failed);
        assert_eq!(summary.timed_out, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&OutcomeStatus::TimedOut).unwrap();
        assert_eq!(json, "\"timed_out\"");
        let json = serde_json::to_string(&OutcomeStatus::SpawnFailed).unwrap();
        assert_eq!(json, "\"spawn_failed\"");
    }
}
