//! Output Classifier
//!
//! Splits a worker's output streams into lines and decides where each line goes.
//!
//! | stream | human mode            | structured mode            |
//! |--------|-----------------------|----------------------------|
//! | stderr | relayed with `SUB: `  | relayed with `SUB: `       |
//! | stdout | relayed with `SUB: `  | buffered for JSON parsing  |
//!
//! Structured mode requires stdout to hold exactly one JSON document per
//! worker, so stdout is never echoed there; stderr stays a free-form
//! diagnostic channel in both modes.

use indicatif::ProgressBar;
use qmlbench_core::OutputMode;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Prefix marking a relayed line as worker output
pub const CHILD_PREFIX: &str = "SUB: ";

/// Worker output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

impl Stream {
    /// Lowercase stream name
    pub fn name(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

/// Destination of relayed worker lines.
///
/// Called from the per-stream reader threads, so implementations must be
/// thread-safe.
pub trait OutputSink: Send + Sync {
    /// Relay one complete line (without its newline) read from `stream`
    fn relay(&self, stream: Stream, line: &str);
}

/// Relays worker lines to the harness's own stdout/stderr
#[derive(Default, Clone)]
pub struct ConsoleSink {
    progress: Option<ProgressBar>,
}

impl ConsoleSink {
    /// Create a console sink; lines are printed around `progress` if given
    pub fn new(progress: Option<ProgressBar>) -> Self {
        Self { progress }
    }
}

impl OutputSink for ConsoleSink {
    fn relay(&self, stream: Stream, line: &str) {
        // a closed console (e.g. piped into `head`) must not take the reader down
        let print = || {
            let _ = match stream {
                Stream::Stdout => write_line(&mut std::io::stdout().lock(), line),
                Stream::Stderr => write_line(&mut std::io::stderr().lock(), line),
            };
        };
        match &self.progress {
            Some(pb) => pb.suspend(print),
            None => print(),
        }
    }
}

fn write_line<W: Write>(out: &mut W, line: &str) -> std::io::Result<()> {
    writeln!(out, "{}{}", CHILD_PREFIX, line)?;
    out.flush()
}

/// Keeps relayed lines in memory, in arrival order
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Stream, String)>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line relayed so far
    pub fn lines(&self) -> Vec<(Stream, String)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Lines relayed from one stream
    pub fn stream_lines(&self, stream: Stream) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, line)| line)
            .collect()
    }
}

impl OutputSink for MemorySink {
    fn relay(&self, stream: Stream, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((stream, line.to_string()));
        }
    }
}

/// Splits a byte stream into `\n`-terminated lines across arbitrary chunk
/// boundaries.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Create an empty splitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completed, without the newline
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            let mut line = std::mem::take(&mut self.pending);
            line.extend_from_slice(&rest[..pos]);
            lines.push(line);
            rest = &rest[pos + 1..];
        }
        self.pending.extend_from_slice(rest);
        lines
    }

    /// Take the unterminated tail at end of stream, if it is not empty
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let tail = std::mem::take(&mut self.pending);
        (!tail.is_empty()).then_some(tail)
    }
}

/// Classifies the lines of one worker stream
pub struct StreamClassifier {
    stream: Stream,
    mode: OutputMode,
    sink: Arc<dyn OutputSink>,
    splitter: LineSplitter,
    structured: Vec<u8>,
}

impl StreamClassifier {
    /// Create a classifier for `stream` under `mode`
    pub fn new(stream: Stream, mode: OutputMode, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            stream,
            mode,
            sink,
            splitter: LineSplitter::new(),
            structured: Vec::new(),
        }
    }

    /// Consume newly read bytes
    pub fn feed(&mut self, chunk: &[u8]) {
        for line in self.splitter.push(chunk) {
            self.classify(&line);
        }
    }

    /// Flush the unterminated tail and return the buffered structured output
    pub fn finish(mut self) -> Vec<u8> {
        if let Some(tail) = self.splitter.finish() {
            self.classify(&tail);
        }
        self.structured
    }

    fn classify(&mut self, line: &[u8]) {
        if line.is_empty() {
            return;
        }
        match (self.stream, self.mode) {
            (Stream::Stdout, OutputMode::Structured) => {
                if !self.structured.is_empty() {
                    self.structured.push(b'\n');
                }
                self.structured.extend_from_slice(line);
            }
            _ => self.sink.relay(self.stream, &String::from_utf8_lossy(line)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splitter_drops_trailing_empty_segment() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.push(b"one\ntwo\n"), vec![b"one".to_vec(), b"two".to_vec()]);
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_splitter_joins_lines_across_chunks() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.push(b"hel").is_empty());
        assert_eq!(splitter.push(b"lo\nwor"), vec![b"hello".to_vec()]);
        assert_eq!(splitter.finish(), Some(b"wor".to_vec()));
    }

    #[test]
    fn test_splitter_keeps_interior_empty_lines() {
        let mut splitter = LineSplitter::new();
        assert_eq!(
            splitter.push(b"a\n\nb\n"),
            vec![b"a".to_vec(), Vec::new(), b"b".to_vec()]
        );
    }

    #[test]
    fn test_stderr_always_relayed() {
        for mode in [OutputMode::Human, OutputMode::Structured] {
            let sink = Arc::new(MemorySink::new());
            let mut classifier = StreamClassifier::new(Stream::Stderr, mode, sink.clone());
            classifier.feed(b"warning: slow\nsecond");
            let buffered = classifier.finish();

            assert!(buffered.is_empty());
            assert_eq!(sink.stream_lines(Stream::Stderr), vec!["warning: slow", "second"]);
        }
    }

    #[test]
    fn test_stdout_relayed_in_human_mode() {
        let sink = Arc::new(MemorySink::new());
        let mut classifier = StreamClassifier::new(Stream::Stdout, OutputMode::Human, sink.clone());
        classifier.feed(b"Average: 59.2\n\nDone\n");

        assert!(classifier.finish().is_empty());
        assert_eq!(sink.stream_lines(Stream::Stdout), vec!["Average: 59.2", "Done"]);
    }

    #[test]
    fn test_stdout_buffered_in_structured_mode() {
        let sink = Arc::new(MemorySink::new());
        let mut classifier =
            StreamClassifier::new(Stream::Stdout, OutputMode::Structured, sink.clone());
        classifier.feed(b"{\n  \"a.qml\": {\n");
        classifier.feed(b"    \"avg\": 1\n\n  }\n}");

        let buffered = classifier.finish();
        assert!(sink.lines().is_empty());
        assert_eq!(buffered, b"{\n  \"a.qml\": {\n    \"avg\": 1\n  }\n}".to_vec());
    }

    /// Writer that fails like a pipe whose reader went away
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_line_reports_closed_pipe_instead_of_panicking() {
        let err = write_line(&mut ClosedPipe, "frame 1").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);

        let mut out = Vec::<u8>::new();
        write_line(&mut out, "frame 1").unwrap();
        assert_eq!(out, b"SUB: frame 1\n".to_vec());
    }

    #[test]
    fn test_structured_buffer_preserves_bytes() {
        let sink = Arc::new(MemorySink::new());
        let mut classifier =
            StreamClassifier::new(Stream::Stdout, OutputMode::Structured, sink.clone());
        classifier.feed("{\"ü\":{\"name\":\"größe\"}}\n".as_bytes());

        assert_eq!(
            classifier.finish(),
            "{\"ü\":{\"name\":\"größe\"}}".as_bytes().to_vec()
        );
    }
}
