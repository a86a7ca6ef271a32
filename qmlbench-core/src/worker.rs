//! Worker Process Entry Point
//!
//! Handles the worker side of the parent/worker split. A worker receives exactly
//! one benchmark input, hands it to the embedding binary's [`SceneRunner`], and
//! reports the result on stdout:
//!
//! - structured mode: one JSON document `{ "<benchmark id>": { ...result } }`
//! - human mode: the benchmark id followed by one `key: value` line per field
//!
//! The wrapper key makes a worker's output self-describing when viewed on its
//! own; the parent strips it again when merging.

use crate::{Benchmark, Options};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

/// Executes one benchmark scene and measures it.
///
/// The rendering engine lives behind this trait; the harness only needs the
/// measured fields back as a JSON object.
pub trait SceneRunner {
    /// Run `benchmark` with the given options and return its result fields
    fn run(
        &mut self,
        benchmark: &Benchmark,
        options: &Options,
    ) -> Result<Map<String, Value>, WorkerError>;
}

/// Errors raised inside a worker process
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Worker was started without an input
    #[error("No benchmark input given to worker")]
    MissingInput,

    /// Worker was given more than one input
    #[error("Worker expects exactly one benchmark input, got {0}")]
    TooManyInputs(usize),

    /// Scene runner reported a failure
    #[error("Benchmark {id} failed: {message}")]
    Benchmark {
        /// Benchmark identifier
        id: String,
        /// Runner's message
        message: String,
    },

    /// Scene runner panicked
    #[error("Benchmark {id} panicked: {message}")]
    Panicked {
        /// Benchmark identifier
        id: String,
        /// Panic payload, when it was a string
        message: String,
    },

    /// Result could not be serialized
    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),

    /// Writing the result failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Convenience constructor for runner-reported failures
    pub fn benchmark(id: impl Into<String>, message: impl Into<String>) -> Self {
        WorkerError::Benchmark {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Worker main routine
pub struct WorkerMain<'a, R: SceneRunner> {
    runner: &'a mut R,
    options: &'a Options,
}

impl<'a, R: SceneRunner> WorkerMain<'a, R> {
    /// Create a worker around a scene runner
    pub fn new(runner: &'a mut R, options: &'a Options) -> Self {
        Self { runner, options }
    }

    /// Run the single benchmark named by `inputs` and write its report to `out`
    pub fn run<W: Write>(&mut self, inputs: &[PathBuf], out: &mut W) -> Result<(), WorkerError> {
        let input = match inputs {
            [] => return Err(WorkerError::MissingInput),
            [input] => input,
            more => return Err(WorkerError::TooManyInputs(more.len())),
        };
        let benchmark = Benchmark::new(input.clone());

        let runner = &mut *self.runner;
        let options = self.options;
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            runner.run(&benchmark, options)
        }));

        let fields = match result {
            Ok(fields) => fields?,
            Err(panic) => {
                let message = if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                return Err(WorkerError::Panicked {
                    id: benchmark.id,
                    message,
                });
            }
        };

        if self.options.is_structured() {
            let mut wrapper = Map::new();
            wrapper.insert(benchmark.id, Value::Object(fields));
            serde_json::to_writer_pretty(&mut *out, &Value::Object(wrapper))?;
            writeln!(out)?;
        } else {
            out.write_all(format_result_text(&benchmark, &fields).as_bytes())?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Human-readable rendering of one benchmark's result fields
pub fn format_result_text(benchmark: &Benchmark, fields: &Map<String, Value>) -> String {
    let mut output = format!("{}\n", benchmark.id);
    for (key, value) in fields {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        output.push_str(&format!("    {}: {}\n", key, value));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OutputMode;
    use serde_json::json;

    struct FixedRunner(Value);

    impl SceneRunner for FixedRunner {
        fn run(&mut self, _: &Benchmark, _: &Options) -> Result<Map<String, Value>, WorkerError> {
            match &self.0 {
                Value::Object(map) => Ok(map.clone()),
                _ => Err(WorkerError::benchmark("fixed", "not an object")),
            }
        }
    }

    struct PanickingRunner;

    impl SceneRunner for PanickingRunner {
        fn run(&mut self, _: &Benchmark, _: &Options) -> Result<Map<String, Value>, WorkerError> {
            panic!("scene exploded");
        }
    }

    fn structured() -> Options {
        Options {
            mode: OutputMode::Structured,
            ..Options::default()
        }
    }

    #[test]
    fn test_structured_output_is_self_wrapped() {
        let mut runner = FixedRunner(json!({ "average": 59.2, "standard-deviation": 0.4 }));
        let options = structured();
        let mut out = Vec::<u8>::new();

        WorkerMain::new(&mut runner, &options)
            .run(&[PathBuf::from("/scenes/rects.qml")], &mut out)
            .unwrap();

        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            parsed,
            json!({ "/scenes/rects.qml": { "average": 59.2, "standard-deviation": 0.4 } })
        );
    }

    #[test]
    fn test_human_output_lists_fields() {
        let mut runner = FixedRunner(json!({ "average": 60 }));
        let options = Options::default();
        let mut out = Vec::<u8>::new();

        WorkerMain::new(&mut runner, &options)
            .run(&[PathBuf::from("a.qml")], &mut out)
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "a.qml\n    average: 60\n");
    }

    #[test]
    fn test_requires_exactly_one_input() {
        let mut runner = FixedRunner(json!({}));
        let options = Options::default();
        let mut worker = WorkerMain::new(&mut runner, &options);

        assert!(matches!(
            worker.run(&[], &mut Vec::<u8>::new()),
            Err(WorkerError::MissingInput)
        ));
        assert!(matches!(
            worker.run(&[PathBuf::from("a.qml"), PathBuf::from("b.qml")], &mut Vec::<u8>::new()),
            Err(WorkerError::TooManyInputs(2))
        ));
    }

    #[test]
    fn test_panic_is_reported_as_error() {
        let mut runner = PanickingRunner;
        let options = structured();
        let mut out = Vec::<u8>::new();

        let err = WorkerMain::new(&mut runner, &options)
            .run(&[PathBuf::from("boom.qml")], &mut out)
            .unwrap_err();

        match err {
            WorkerError::Panicked { id, message } => {
                assert_eq!(id, "boom.qml");
                assert_eq!(message, "scene exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(out.is_empty());
    }
}
