//! Worker Invocation
//!
//! Builds the argument vector for one worker run. A worker is the same
//! executable started with a hidden marker flag, every flag the parent was
//! given, and exactly one benchmark input as its only positional argument.

use crate::benchmark::Benchmark;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Hidden flag that switches a process into worker mode
pub const SUBPROCESS_FLAG: &str = "--silently-really-run-and-bypass-subprocess";

/// Program and ordered arguments for one child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInvocation {
    program: PathBuf,
    args: Vec<OsString>,
}

impl WorkerInvocation {
    /// Create an invocation from an explicit program and argument list
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Executable to start
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments, not including the program itself
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Space-joined argument list, for diagnostics
    pub fn display_args(&self) -> String {
        self.args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The per-run part of every worker invocation: marker flag plus forwarded flags.
///
/// Built once per run; [`BaseInvocation::for_benchmark`] appends one input.
#[derive(Debug, Clone)]
pub struct BaseInvocation {
    program: PathBuf,
    args: Vec<OsString>,
}

impl BaseInvocation {
    /// Sanitize the parent's own argument list.
    ///
    /// `original_args[0]` is the parent's program path and is dropped, as is
    /// every argument equal to one of `positionals`.
    pub fn new<S: AsRef<OsStr>>(
        program: impl Into<PathBuf>,
        original_args: &[S],
        positionals: &[S],
    ) -> Self {
        let mut args = vec![OsString::from(SUBPROCESS_FLAG)];
        args.extend(
            original_args
                .iter()
                .skip(1)
                .map(|arg| -> &OsStr { arg.as_ref() })
                .filter(|arg| !positionals.iter().any(|p| p.as_ref() == *arg))
                .map(OsStr::to_os_string),
        );
        Self {
            program: program.into(),
            args,
        }
    }

    /// Marker flag followed by the forwarded flags
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Complete invocation selecting exactly one benchmark
    pub fn for_benchmark(&self, benchmark: &Benchmark) -> WorkerInvocation {
        let mut args = self.args.clone();
        args.push(benchmark.input.clone().into_os_string());
        WorkerInvocation {
            program: self.program.clone(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_marker_first_input_last() {
        let original = ["qmlbench", "--json", "--repeat", "3", "scenes/", "extra.qml"];
        let positionals = ["scenes/", "extra.qml"];
        let bench = Benchmark::new("/abs/scenes/rects.qml");

        let invocation =
            BaseInvocation::new("qmlbench", &original, &positionals).for_benchmark(&bench);
        assert_eq!(
            invocation.args(),
            os(&[SUBPROCESS_FLAG, "--json", "--repeat", "3", "/abs/scenes/rects.qml"])
        );
    }

    #[test]
    fn test_program_path_is_not_forwarded() {
        let original = ["/usr/bin/qmlbench", "-v"];
        let bench = Benchmark::new("a.qml");

        let invocation =
            BaseInvocation::new("/usr/bin/qmlbench", &original, &[]).for_benchmark(&bench);
        assert_eq!(invocation.args(), os(&[SUBPROCESS_FLAG, "-v", "a.qml"]));
    }

    #[test]
    fn test_each_benchmark_gets_exactly_one_input() {
        let original = ["qmlbench", "--shell", "frame-count", "a.qml", "b.qml"];
        let positionals = ["a.qml", "b.qml"];
        let base = BaseInvocation::new("/usr/bin/qmlbench", &original, &positionals);

        let first = base.for_benchmark(&Benchmark::new("/abs/a.qml"));
        let second = base.for_benchmark(&Benchmark::new("/abs/b.qml"));

        assert_eq!(first.program(), Path::new("/usr/bin/qmlbench"));
        assert_eq!(first.args().last(), Some(&OsString::from("/abs/a.qml")));
        assert_eq!(second.args().last(), Some(&OsString::from("/abs/b.qml")));
        assert_eq!(first.args().len(), second.args().len());
        assert_eq!(
            first.display_args(),
            format!("{SUBPROCESS_FLAG} --shell frame-count /abs/a.qml")
        );
    }
}
