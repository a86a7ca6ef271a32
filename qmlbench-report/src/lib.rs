#![warn(missing_docs)]
//! qmlbench Report - Aggregate Run Report
//!
//! Data structures for the single document a structured run emits, plus the
//! JSON and human renderings of it:
//! - `meta`: run identifier, window size, shell, timestamp, system information
//! - `results`: benchmark identifier → the worker's unwrapped result object
//! - `outcomes`: what happened to every benchmark, including absent ones
//! - `summary`: counts per outcome and the overall run status

mod human;
mod json;
mod report;

pub use human::format_human_summary;
pub use json::generate_json_report;
pub use report::{
    BenchmarkOutcome, OutcomeStatus, Report, ReportMeta, ReportSummary, ResultSet, SystemInfo,
};
