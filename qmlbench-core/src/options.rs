//! Run Options
//!
//! The resolved configuration for one harness invocation. It is built once from
//! the command line and passed by reference to the run coordinator and to the
//! worker's `SceneRunner`; nothing reads options from process-wide state.

use serde::{Deserialize, Serialize};

/// Window size used when none (or an invalid one) is requested
pub const DEFAULT_WINDOW_SIZE: WindowSize = WindowSize {
    width: 800,
    height: 600,
};

/// How results are presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Relay worker output line by line for a human reader
    #[default]
    Human,
    /// Emit one machine-parseable JSON document for the whole run
    Structured,
}

impl OutputMode {
    /// Whether this is the JSON mode
    pub fn is_structured(self) -> bool {
        matches!(self, OutputMode::Structured)
    }
}

/// Benchmark shell wrapped around each scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShellTemplate {
    /// Grow the instance count until the frame rate drops
    #[default]
    SustainedFps,
    /// Fixed instance count, measure the sustained frame rate
    StaticCount,
    /// Fixed instance count, count frames rendered in an interval
    FrameCount,
}

impl ShellTemplate {
    /// Resolve a template name; unknown or empty names fall back to `sustained-fps`
    pub fn from_name(name: &str) -> Self {
        match name {
            "static-count" => ShellTemplate::StaticCount,
            "frame-count" => ShellTemplate::FrameCount,
            _ => ShellTemplate::SustainedFps,
        }
    }

    /// Command line name of the template
    pub fn name(self) -> &'static str {
        match self {
            ShellTemplate::SustainedFps => "sustained-fps",
            ShellTemplate::StaticCount => "static-count",
            ShellTemplate::FrameCount => "frame-count",
        }
    }

    /// Shell resource the scene runner loads
    pub fn resource(self) -> &'static str {
        match self {
            ShellTemplate::SustainedFps => "qrc:/Shell_SustainedFpsWithCount.qml",
            ShellTemplate::StaticCount => "qrc:/Shell_SustainedFpsWithStaticCount.qml",
            ShellTemplate::FrameCount => "qrc:/Shell_TotalFramesWithStaticCount.qml",
        }
    }
}

/// Window dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl WindowSize {
    /// Build a window size, rejecting non-positive dimensions
    pub fn new(width: i64, height: i64) -> Option<Self> {
        let width = u32::try_from(width).ok().filter(|w| *w > 0)?;
        let height = u32::try_from(height).ok().filter(|h| *h > 0)?;
        Some(Self { width, height })
    }
}

impl std::fmt::Display for WindowSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Resolved options for one harness invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Run identifier recorded in the JSON output
    pub id: String,
    /// Verbose mode
    pub verbose: bool,
    /// Human or structured output
    pub mode: OutputMode,
    /// Times to repeat each benchmark (at least 1)
    pub repeat: u32,
    /// Initial delay before benchmarks start, in milliseconds
    pub delay_ms: u64,
    /// Window size
    pub window_size: WindowSize,
    /// Render fullscreen
    pub fullscreen: bool,
    /// Frame rate measurement interval in milliseconds (at least 500)
    pub fps_interval_ms: f64,
    /// Tolerated deviation from the target frame rate in percent (at least 1)
    pub fps_tolerance: f64,
    /// Refresh rate to assume instead of the screen's
    pub fps_override: Option<f64>,
    /// Benchmark shell
    pub shell: ShellTemplate,
    /// Instance count override for the count-based shells (-1 = benchmark default)
    pub count: i64,
    /// Frame counting interval in milliseconds for the `frame-count` shell
    pub frame_count_interval_ms: u64,
    /// Multiplier applied to static counts to compare faster or slower hardware
    pub hardware_multiplier: f64,
}

impl Options {
    /// Minimum accepted frame rate measurement interval
    pub const MIN_FPS_INTERVAL_MS: f64 = 500.0;
    /// Minimum accepted frame rate tolerance
    pub const MIN_FPS_TOLERANCE: f64 = 1.0;

    /// Apply the lower bounds on repeat count, fps interval and fps tolerance
    pub fn clamped(mut self) -> Self {
        self.repeat = self.repeat.max(1);
        self.fps_interval_ms = self.fps_interval_ms.max(Self::MIN_FPS_INTERVAL_MS);
        self.fps_tolerance = self.fps_tolerance.max(Self::MIN_FPS_TOLERANCE);
        self
    }

    /// Whether measured operations are frames rather than instance counts
    pub fn ops_are_frames(&self) -> bool {
        self.shell == ShellTemplate::FrameCount
    }

    /// Whether the run emits JSON
    pub fn is_structured(&self) -> bool {
        self.mode.is_structured()
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            id: String::new(),
            verbose: false,
            mode: OutputMode::Human,
            repeat: 5,
            delay_ms: 2000,
            window_size: DEFAULT_WINDOW_SIZE,
            fullscreen: false,
            fps_interval_ms: 1000.0,
            fps_tolerance: 2.0,
            fps_override: None,
            shell: ShellTemplate::SustainedFps,
            count: -1,
            frame_count_interval_ms: 20_000,
            hardware_multiplier: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_template_names() {
        assert_eq!(ShellTemplate::from_name("static-count"), ShellTemplate::StaticCount);
        assert_eq!(ShellTemplate::from_name("frame-count"), ShellTemplate::FrameCount);
        assert_eq!(ShellTemplate::from_name("sustained-fps"), ShellTemplate::SustainedFps);
        assert_eq!(ShellTemplate::from_name("bogus"), ShellTemplate::SustainedFps);
        assert_eq!(ShellTemplate::from_name(""), ShellTemplate::SustainedFps);
        assert_eq!(
            ShellTemplate::FrameCount.resource(),
            "qrc:/Shell_TotalFramesWithStaticCount.qml"
        );
    }

    #[test]
    fn test_clamped_applies_lower_bounds() {
        let options = Options {
            repeat: 0,
            fps_interval_ms: 100.0,
            fps_tolerance: 0.25,
            ..Options::default()
        }
        .clamped();

        assert_eq!(options.repeat, 1);
        assert_eq!(options.fps_interval_ms, 500.0);
        assert_eq!(options.fps_tolerance, 1.0);
    }

    #[test]
    fn test_window_size_rejects_non_positive() {
        assert_eq!(WindowSize::new(1024, 768).map(|s| s.to_string()), Some("1024x768".to_string()));
        assert!(WindowSize::new(0, 600).is_none());
        assert!(WindowSize::new(800, -1).is_none());
    }

    #[test]
    fn test_frame_count_shell_counts_frames() {
        let options = Options {
            shell: ShellTemplate::FrameCount,
            ..Options::default()
        };
        assert!(options.ops_are_frames());
        assert!(!Options::default().ops_are_frames());
    }
}
