//! Input Discovery
//!
//! Turns the positional command line inputs into the ordered benchmark list.
//!
//! - A path ending in `.qml` becomes one benchmark (absolute path).
//! - A directory is walked recursively for `.qml` files, in sorted order.
//! - Missing inputs are reported and skipped.
//!
//! Two scenes with the same base name would produce ambiguous results, so a
//! duplicate name anywhere in the run is a hard error raised before any worker
//! is spawned.

use crate::SCENE_EXTENSION;
use crate::benchmark::{Benchmark, scene_name};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

/// Errors that abort discovery
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Two scenes share a base name
    #[error("Found basename '{name}' in {found} and {previous}; can't continue with a duplicate basename")]
    DuplicateName {
        /// Shared base name
        name: String,
        /// Directory of the scene being added
        found: PathBuf,
        /// Directory of the scene seen first
        previous: PathBuf,
    },

    /// An input or a directory under it could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Resolve positional inputs into benchmarks, in input order.
pub fn discover_benchmarks<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<Benchmark>, DiscoveryError> {
    let mut benchmarks = Vec::new();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for input in inputs {
        let input = input.as_ref();
        if !input.exists() {
            warn!(input = %input.display(), "input doesn't exist");
            continue;
        }

        let found = if is_scene(input) {
            let absolute = std::fs::canonicalize(input).map_err(|source| DiscoveryError::Io {
                path: input.to_path_buf(),
                source,
            })?;
            vec![absolute]
        } else if input.is_dir() {
            let mut files = Vec::new();
            collect_scenes(input, &mut files)?;
            files
        } else {
            warn!(input = %input.display(), "input is neither a .qml file nor a directory, ignoring");
            continue;
        };

        for path in found {
            let name = scene_name(&path).unwrap_or_default().to_string();
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            if let Some(previous) = seen.get(&name) {
                return Err(DiscoveryError::DuplicateName {
                    name,
                    found: dir,
                    previous: previous.clone(),
                });
            }
            seen.insert(name, dir);
            benchmarks.push(Benchmark::new(path));
        }
    }

    Ok(benchmarks)
}

fn is_scene(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(SCENE_EXTENSION)
}

/// Walk `dir` for scenes in file name order. Symlinks are not followed, so a
/// link back into the tree can't produce the same scene twice.
fn collect_scenes(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), DiscoveryError> {
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            DiscoveryError::Io {
                path,
                source: e.into(),
            }
        })?;
        if entry.file_type().is_file() && is_scene(entry.path()) {
            out.push(entry.into_path());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "import QtQuick 2.0\nItem {}\n").unwrap();
    }

    #[test]
    fn test_single_file_is_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let scene = dir.path().join("rects.qml");
        touch(&scene);

        let benches = discover_benchmarks(&[&scene]).unwrap();
        assert_eq!(benches.len(), 1);
        assert!(benches[0].input.is_absolute());
        assert_eq!(benches[0].name(), "rects");
    }

    #[test]
    fn test_directory_walk_is_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.qml"));
        touch(&dir.path().join("a.qml"));
        touch(&dir.path().join("nested/c.qml"));
        touch(&dir.path().join("README.md"));

        let benches = discover_benchmarks(&[dir.path()]).unwrap();
        let names: Vec<_> = benches.iter().map(|b| b.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_missing_input_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let scene = dir.path().join("present.qml");
        touch(&scene);

        let benches = discover_benchmarks(&[dir.path().join("absent.qml"), scene]).unwrap();
        assert_eq!(benches.len(), 1);
        assert_eq!(benches[0].name(), "present");
    }

    #[test]
    fn test_duplicate_basename_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("one/rects.qml"));
        touch(&dir.path().join("two/rects.qml"));

        let err = discover_benchmarks(&[dir.path()]).unwrap_err();
        match err {
            DiscoveryError::DuplicateName { name, .. } => assert_eq!(name, "rects"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_same_file_twice_is_a_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let scene = dir.path().join("rects.qml");
        touch(&scene);

        assert!(matches!(
            discover_benchmarks(&[&scene, &scene]),
            Err(DiscoveryError::DuplicateName { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_back_into_tree_is_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.qml"));
        std::os::unix::fs::symlink(".", dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink("a.qml", dir.path().join("alias.qml")).unwrap();

        let benches = discover_benchmarks(&[dir.path()]).unwrap();
        let names: Vec<_> = benches.iter().map(|b| b.name().to_string()).collect();
        assert_eq!(names, vec!["a"]);
    }
}
