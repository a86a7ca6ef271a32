//! Synthetic scene runner
//!
//! Stands in for a real rendering backend: it "renders" each scene by hashing
//! its source once per repetition and reports made-up operation counts. Useful
//! for trying the harness without a graphics stack.
//!
//! Run with:
//!   cargo run --example synthetic -- path/to/scenes/              # human output
//!   cargo run --example synthetic -- --json --delay 0 scenes/     # one JSON document
//!   cargo run --example synthetic -- -v --repeat 3 a.qml b.qml    # settings banner

use qmlbench::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

struct SyntheticRunner;

impl SceneRunner for SyntheticRunner {
    fn run(&mut self, benchmark: &Benchmark, options: &Options) -> Result<Map<String, Value>, WorkerError> {
        let source = std::fs::read_to_string(&benchmark.input)
            .map_err(|e| WorkerError::benchmark(&benchmark.id, e.to_string()))?;

        std::thread::sleep(Duration::from_millis(options.delay_ms));

        let mut results = Vec::with_capacity(options.repeat as usize);
        for iteration in 0..options.repeat {
            let started = Instant::now();
            let mut hasher = DefaultHasher::new();
            (iteration, &source).hash(&mut hasher);
            let ops = 1000 + hasher.finish() % 500;
            let ops = (ops as f64 * options.hardware_multiplier).round();
            eprintln!(
                "{}: iteration {} took {:?}",
                benchmark.name(),
                iteration,
                started.elapsed()
            );
            results.push(ops);
        }

        let average = results.iter().sum::<f64>() / results.len() as f64;
        let mut fields = Map::new();
        fields.insert("average".to_string(), json!(average));
        fields.insert("results".to_string(), json!(results));
        fields.insert("shell".to_string(), json!(options.shell.name()));
        fields.insert("opsAreFrames".to_string(), json!(options.ops_are_frames()));
        fields.insert(
            "windowSize".to_string(),
            json!(options.window_size.to_string()),
        );
        Ok(fields)
    }
}

fn main() -> anyhow::Result<()> {
    qmlbench::run(&mut SyntheticRunner)
}
