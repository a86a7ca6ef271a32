//! Configuration loading from qmlbench.toml
//!
//! Harness-level settings that do not belong on the command line (they would
//! be forwarded to every worker) live in a `qmlbench.toml` file, discovered by
//! walking up from the current directory.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "qmlbench.toml";

/// qmlbench configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QmlbenchConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// What the coordinator does with the remaining benchmarks after a worker hangs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnHang {
    /// Keep running every remaining benchmark (default)
    #[default]
    Continue,
    /// Record every remaining benchmark as skipped without starting it
    SkipRemaining,
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Wall-clock limit for one worker (e.g. "10m", "90s")
    #[serde(default = "default_hang_timeout")]
    pub hang_timeout: String,
    /// Policy after a hang: "continue" or "skip-remaining"
    #[serde(default)]
    pub on_hang: OnHang,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            hang_timeout: default_hang_timeout(),
            on_hang: OnHang::default(),
        }
    }
}

fn default_hang_timeout() -> String {
    "10m".to_string()
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Also write the JSON report to this file
    #[serde(default)]
    pub report_path: Option<String>,
}

impl QmlbenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Discover `qmlbench.toml` by walking up from the current directory.
    ///
    /// Returns the default configuration when no file exists; a file that
    /// exists but does not parse is an error.
    pub fn discover() -> anyhow::Result<Self> {
        let mut dir = std::env::current_dir()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path).map_err(|e| {
                    anyhow::anyhow!("Invalid configuration {}: {}", config_path.display(), e)
                });
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(Self::default())
    }

    /// Resolved hang timeout
    pub fn hang_timeout(&self) -> anyhow::Result<Duration> {
        Self::parse_duration(&self.runner.hang_timeout)
    }

    /// Parse duration string (e.g., "3s", "500ms", "10m")
    pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow::anyhow!("Invalid duration: {}", s));
        }

        let multiplier: f64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1.0,
            "us" | "µs" => 1_000.0,
            "ms" => 1_000_000.0,
            "s" => 1_000_000_000.0,
            "m" | "min" => 60_000_000_000.0,
            "h" => 3_600_000_000_000.0,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok(Duration::from_nanos((value * multiplier) as u64))
    }
}
