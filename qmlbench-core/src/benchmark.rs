//! Benchmark Definition

use std::path::{Path, PathBuf};

/// One workload to run in its own worker process.
///
/// The identifier is derived from the input path and keys the benchmark's
/// entry in the aggregate result set, so it must be unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Benchmark {
    /// Stable identifier, unique within a run
    pub id: String,
    /// Resolved input handed to the worker as its sole positional argument
    pub input: PathBuf,
}

impl Benchmark {
    /// Create a benchmark whose identifier is the input path itself
    pub fn new(input: impl Into<PathBuf>) -> Self {
        let input = input.into();
        Self {
            id: input.to_string_lossy().into_owned(),
            input,
        }
    }

    /// Scene base name without directory or extension (e.g. `rects` for `a/rects.qml`)
    pub fn name(&self) -> &str {
        scene_name(&self.input).unwrap_or(&self.id)
    }
}

pub(crate) fn scene_name(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}
