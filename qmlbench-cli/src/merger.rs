//! Result Merger
//!
//! A structured-mode worker prints one JSON document shaped as
//! `{ "<anything>": { ...fields... } }`. The merger strips the single-key
//! wrapper and files the inner object under the benchmark's identifier.

use qmlbench_report::ResultSet;
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a worker's structured output could not be merged
#[derive(Debug, Error)]
pub enum MergeError {
    /// Not valid JSON
    #[error("{0}")]
    Parse(#[from] serde_json::Error),

    /// Top-level value is not an object
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// Wrapper object does not have exactly one member
    #[error("expected exactly one wrapper member, found {0}")]
    WrapperMembers(usize),

    /// Wrapper's single member is not an object
    #[error("wrapped result under {0:?} is not a JSON object")]
    InnerNotObject(String),
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Strip the single-member wrapper from a worker document
pub fn unwrap_result(document: Value) -> Result<Map<String, Value>, MergeError> {
    let Value::Object(wrapper) = document else {
        return Err(MergeError::NotAnObject(kind(&document)));
    };
    if wrapper.len() != 1 {
        return Err(MergeError::WrapperMembers(wrapper.len()));
    }
    match wrapper.into_iter().next() {
        Some((_, Value::Object(inner))) => Ok(inner),
        Some((key, _)) => Err(MergeError::InnerNotObject(key)),
        None => Err(MergeError::WrapperMembers(0)),
    }
}

/// Results collected across the run, keyed by benchmark identifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateResults {
    results: ResultSet,
}

impl AggregateResults {
    /// Create an empty result set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one worker's buffered stdout and store it under `id`.
    ///
    /// A later merge for the same identifier replaces the earlier entry. On
    /// error the set is left unchanged.
    pub fn merge(&mut self, id: &str, raw: &[u8]) -> Result<(), MergeError> {
        let document: Value = serde_json::from_slice(raw)?;
        let inner = unwrap_result(document)?;
        self.results.insert(id.to_string(), inner);
        Ok(())
    }

    /// Result stored for `id`
    pub fn get(&self, id: &str) -> Option<&Map<String, Value>> {
        self.results.get(id)
    }

    /// Whether a result is stored for `id`
    pub fn contains(&self, id: &str) -> bool {
        self.results.contains_key(id)
    }

    /// Number of stored results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// True when no result has been stored
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &ResultSet {
        &self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_unwraps_single_member() {
        let mut results = AggregateResults::new();
        results
            .merge("/b/rects.qml", br#"{"rects.qml": {"average": 1234.5, "samples": [1, 2]}}"#)
            .unwrap();

        assert_eq!(results.len(), 1);
        let entry = results.get("/b/rects.qml").unwrap();
        assert_eq!(entry["average"], json!(1234.5));
        assert_eq!(entry["samples"], json!([1, 2]));
    }

    #[test]
    fn test_wrapper_key_is_ignored() {
        let mut results = AggregateResults::new();
        results.merge("id-1", br#"{"whatever": {"x": 1}}"#).unwrap();

        assert!(results.contains("id-1"));
        assert!(!results.contains("whatever"));
    }

    #[test]
    fn test_empty_inner_object_is_stored() {
        let mut results = AggregateResults::new();
        results.merge("a", br#"{"k": {}}"#).unwrap();

        assert!(results.get("a").unwrap().is_empty());
    }

    #[test]
    fn test_merge_is_last_write_wins() {
        let mut results = AggregateResults::new();
        results.merge("a", br#"{"k": {"v": 1}}"#).unwrap();
        results.merge("a", br#"{"k": {"v": 2}}"#).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results.get("a").unwrap()["v"], json!(2));
    }

    #[test]
    fn test_repeated_merge_is_stable() {
        let raw = br#"{"k": {"v": [1, 2, 3]}}"#;
        let mut once = AggregateResults::new();
        once.merge("a", raw).unwrap();
        let mut twice = once.clone();
        twice.merge("a", raw).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_parse_failure_leaves_set_unchanged() {
        let mut results = AggregateResults::new();
        results.merge("a", br#"{"k": {"v": 1}}"#).unwrap();

        let err = results.merge("b", b"not json").unwrap_err();
        assert!(matches!(err, MergeError::Parse(_)));
        let err = results.merge("a", b"{\"k\": {\"v\": 2}").unwrap_err();
        assert!(matches!(err, MergeError::Parse(_)));

        assert_eq!(results.len(), 1);
        assert_eq!(results.get("a").unwrap()["v"], json!(1));
    }

    #[test]
    fn test_shape_errors() {
        let mut results = AggregateResults::new();

        assert!(matches!(
            results.merge("a", b"[1, 2]").unwrap_err(),
            MergeError::NotAnObject("an array")
        ));
        assert!(matches!(
            results.merge("a", b"{}").unwrap_err(),
            MergeError::WrapperMembers(0)
        ));
        assert!(matches!(
            results.merge("a", br#"{"x": {}, "y": {}}"#).unwrap_err(),
            MergeError::WrapperMembers(2)
        ));
        assert!(matches!(
            results.merge("a", br#"{"x": 3}"#).unwrap_err(),
            MergeError::InnerNotObject(ref key) if key == "x"
        ));
        assert!(results.is_empty());
    }
}
