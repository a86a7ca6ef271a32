//! Human Output
//!
//! End-of-run summary for human mode. Worker output has already been relayed
//! line by line at this point, so this only lists outcomes.

use crate::report::{OutcomeStatus, Report};

/// Format the outcome list and counts for terminal display
pub fn format_human_summary(report: &Report) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("qmlbench Results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    for outcome in &report.outcomes {
        output.push_str(&format!("  {} {}", outcome.status.icon(), outcome.benchmark));
        match outcome.status {
            OutcomeStatus::Completed | OutcomeStatus::Recorded => {
                if let Some(code) = outcome.exit_code.filter(|c| *c != 0) {
                    output.push_str(&format!("  (exit code {})", code));
                }
            }
            OutcomeStatus::TimedOut => output.push_str("  (hung, killed)"),
            OutcomeStatus::Crashed => output.push_str("  (crashed)"),
            OutcomeStatus::Skipped => output.push_str("  (skipped)"),
            OutcomeStatus::NoOutput => output.push_str("  (no output)"),
            OutcomeStatus::WaitFailed => output.push_str("  (lost, killed)"),
            OutcomeStatus::InvalidOutput | OutcomeStatus::SpawnFailed => {}
        }
        output.push_str(&format!("  [{:.0} ms]\n", outcome.duration_ms));
        if let Some(detail) = &outcome.detail {
            output.push_str(&format!("      {}\n", detail));
        }
    }

    let summary = &report.summary;
    output.push('\n');
    output.push_str("Summary\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "  Total: {}  Crashed: {}  Timed out: {}  Spawn failures: {}  Skipped: {}\n",
        summary.total_benchmarks,
        summary.crashed,
        summary.timed_out,
        summary.spawn_failed,
        summary.skipped
    ));
    if summary.wait_failed > 0 {
        output.push_str(&format!("  Lost workers: {}\n", summary.wait_failed));
    }
    output.push_str(&format!(
        "  Status: {}  ({:.1} s)\n",
        if summary.failed { "FAILED" } else { "ok" },
        summary.total_duration_ms / 1000.0
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{BenchmarkOutcome, ReportMeta, ResultSet, SystemInfo};

    fn meta() -> ReportMeta {
        ReportMeta {
            schema_version: 1,
            version: "0.1.0".to_string(),
            id: String::new(),
            timestamp: chrono::Utc::now(),
            window_size: "800x600".to_string(),
            shell: "sustained-fps".to_string(),
            system: SystemInfo {
                os: "linux".to_string(),
                arch: "x86_64".to_string(),
                cpu: "test".to_string(),
                cpu_cores: 1,
                memory_gb: 1.0,
            },
        }
    }

    #[test]
    fn test_summary_lists_every_outcome() {
        let outcomes = vec![
            BenchmarkOutcome {
                benchmark: "a.qml".to_string(),
                status: OutcomeStatus::Completed,
                exit_code: Some(1),
                duration_ms: 10.0,
                detail: None,
            },
            BenchmarkOutcome {
                benchmark: "b.qml".to_string(),
                status: OutcomeStatus::TimedOut,
                exit_code: None,
                duration_ms: 600_000.0,
                detail: None,
            },
        ];
        let report = Report::new(meta(), ResultSet::new(), outcomes, 600_010.0);

        let text = format_human_summary(&report);
        assert!(text.contains("✓ a.qml  (exit code 1)"));
        assert!(text.contains("⏱ b.qml  (hung, killed)"));
        assert!(text.contains("Status: FAILED"));
    }
}
