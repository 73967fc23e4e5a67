//! Change tracking
//!
//! Records the dot-paths touched by writes to a document. A compound value
//! written wholesale records its own path and every path beneath it, so a
//! replaced subtree is fully enumerated. The empty path is never recorded.

use std::collections::BTreeSet;

use crate::value::Value;

/// Set of dot-joined paths changed since the last validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedPaths {
    paths: BTreeSet<String>,
}

impl ChangedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a path; empty paths are ignored
    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if path.is_empty() {
            return false;
        }
        self.paths.insert(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// First segment of every recorded path, deduplicated and sorted
    pub fn top_level(&self) -> BTreeSet<String> {
        self.paths
            .iter()
            .filter_map(|p| p.split('.').next())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }
}

impl<S: Into<String>> FromIterator<S> for ChangedPaths {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut changed = ChangedPaths::new();
        for path in iter {
            changed.insert(path);
        }
        changed
    }
}

/// Records `path` and, for compound values, every member path beneath it.
pub fn mark_changed<S: AsRef<str>>(changed: &mut ChangedPaths, value: &Value, path: &[S]) {
    let mut segments: Vec<String> = path.iter().map(|s| s.as_ref().to_string()).collect();
    mark_recursive(changed, value, &mut segments);
}

fn mark_recursive(changed: &mut ChangedPaths, value: &Value, path: &mut Vec<String>) {
    if !path.is_empty() {
        changed.insert(path.join("."));
    }

    match value {
        Value::Object(map) => {
            for (key, member) in map {
                path.push(key.clone());
                mark_recursive(changed, member, path);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, member) in items.iter().enumerate() {
                path.push(index.to_string());
                mark_recursive(changed, member, path);
                path.pop();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_replacement_enumerates_leaves() {
        let mut changed = ChangedPaths::new();
        mark_changed::<&str>(&mut changed, &Value::from(json!({ "p": { "q": 1 } })), &[]);

        assert!(changed.contains("p.q"));
        assert!(changed.contains("p"));
        assert!(!changed.contains(""));
        assert_eq!(changed.len(), 2);
    }

    #[test]
    fn test_scalar_at_root_records_nothing() {
        let mut changed = ChangedPaths::new();
        mark_changed::<&str>(&mut changed, &Value::Integer(1), &[]);
        assert!(changed.is_empty());
    }

    #[test]
    fn test_scalar_at_path() {
        let mut changed = ChangedPaths::new();
        mark_changed(&mut changed, &Value::from("Lyon"), &["address", "city"]);
        assert_eq!(changed.iter().collect::<Vec<_>>(), vec!["address.city"]);
    }

    #[test]
    fn test_arrays_use_indices() {
        let mut changed = ChangedPaths::new();
        mark_changed(&mut changed, &Value::from(json!(["a", { "b": true }])), &["tags"]);

        let paths: Vec<&str> = changed.iter().collect();
        assert_eq!(paths, vec!["tags", "tags.0", "tags.1", "tags.1.b"]);
    }

    #[test]
    fn test_empty_compound_records_its_own_path() {
        let mut changed = ChangedPaths::new();
        mark_changed(&mut changed, &Value::from(json!({})), &["meta"]);
        assert!(changed.contains("meta"));
    }

    #[test]
    fn test_top_level() {
        let changed: ChangedPaths = ["b.c", "a", "b.d.e", "a.x"].into_iter().collect();
        let top: Vec<String> = changed.top_level().into_iter().collect();
        assert_eq!(top, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_clear() {
        let mut changed: ChangedPaths = ["a"].into_iter().collect();
        changed.clear();
        assert!(changed.is_empty());
        assert!(!changed.insert(""));
    }
}
