//! System Metadata Collection
//!
//! Collects the run settings and host information recorded next to the
//! results. Linux-specific data (CPU model, memory) degrades to "Unknown" or 0
//! on other platforms.

use chrono::Utc;
use qmlbench_core::Options;
use qmlbench_report::{ReportMeta, SystemInfo};

/// Version of the report layout
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Build report metadata for a run with `options`
pub fn build_report_meta(options: &Options) -> ReportMeta {
    let system = SystemInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpu: get_cpu_model().unwrap_or_else(|| "Unknown".to_string()),
        cpu_cores: num_cpus(),
        memory_gb: get_memory_gb().unwrap_or(0.0),
    };

    ReportMeta {
        schema_version: REPORT_SCHEMA_VERSION,
        version: env!("CARGO_PKG_VERSION").to_string(),
        id: options.id.clone(),
        timestamp: Utc::now(),
        window_size: options.window_size.to_string(),
        shell: options.shell.name().to_string(),
        system,
    }
}

/// CPU model name from /proc/cpuinfo (Linux only)
fn get_cpu_model() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|l| l.starts_with("model name"))
                    .and_then(|l| l.split(':').nth(1))
                    .map(|s| s.trim().to_string())
            })
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

fn num_cpus() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}

/// Total system memory in GB (Linux only)
fn get_memory_gb() -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/meminfo")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|l| l.starts_with("MemTotal"))
                    .and_then(|l| {
                        l.split_whitespace()
                            .nth(1)
                            .and_then(|s| s.parse::<u64>().ok())
                    })
                    .map(|kb| kb as f64 / 1024.0 / 1024.0)
            })
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmlbench_core::{ShellTemplate, WindowSize};

    #[test]
    fn test_meta_carries_run_settings() {
        let options = Options {
            id: "nightly-42".to_string(),
            window_size: WindowSize::new(1920, 1080).unwrap(),
            shell: ShellTemplate::FrameCount,
            ..Options::default()
        };

        let meta = build_report_meta(&options);
        assert_eq!(meta.schema_version, REPORT_SCHEMA_VERSION);
        assert_eq!(meta.id, "nightly-42");
        assert_eq!(meta.window_size, "1920x1080");
        assert_eq!(meta.shell, "frame-count");
        assert!(meta.system.cpu_cores >= 1);
        assert!(!meta.system.os.is_empty());
    }
}
