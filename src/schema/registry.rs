//! Named filter constructors for declarative schemas
//!
//! Each entry builds a [`Filter`] from JSON arguments. Type-defining filters
//! are not listed here; declarative fields select their type separately.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value as JsonValue;

use super::errors::{StructureError, StructureResult};
use super::filters::{self, Filter};
use crate::value::Value;

/// Builds a filter from its JSON arguments
pub type FilterBuilder = dyn Fn(&[JsonValue]) -> StructureResult<Filter> + Send + Sync;

/// Table of filter constructors keyed by catalogue name.
#[derive(Clone)]
pub struct FilterRegistry {
    builders: BTreeMap<String, Arc<FilterBuilder>>,
}

impl FilterRegistry {
    /// Registry with every catalogue filter
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register("equal", |args| {
            Ok(filters::equal(Value::from(arg(args, 0, "equal")?.clone())))
        });
        registry.register("min", |args| Ok(filters::min(arg_f64(args, 0, "min")?)));
        registry.register("max", |args| Ok(filters::max(arg_f64(args, 0, "max")?)));
        registry.register("range", |args| {
            Ok(filters::range(
                arg_f64(args, 0, "range")?,
                arg_f64(args, 1, "range")?,
            ))
        });
        registry.register("after", |args| {
            Ok(filters::after(arg_datetime(args, 0, "after")?))
        });
        registry.register("before", |args| {
            Ok(filters::before(arg_datetime(args, 0, "before")?))
        });
        registry.register("length", |args| {
            Ok(filters::length(arg_usize(args, 0, "length")?))
        });
        registry.register("min_length", |args| {
            Ok(filters::min_length(arg_usize(args, 0, "min_length")?))
        });
        registry.register("max_length", |args| {
            Ok(filters::max_length(arg_usize(args, 0, "max_length")?))
        });
        registry.register("matches", |args| {
            let pattern = arg_str(args, 0, "matches")?;
            let regex = Regex::new(pattern).map_err(|e| {
                StructureError::new(format!("Filter 'matches': invalid pattern: {}", e))
            })?;
            Ok(filters::matches(regex))
        });
        registry.register("trim", |_| Ok(filters::trim()));
        registry.register("to_lower_case", |_| Ok(filters::to_lower_case()));
        registry.register("to_upper_case", |_| Ok(filters::to_upper_case()));
        registry.register("email", |_| Ok(filters::email()));

        registry
    }

    /// Registry with no entries
    pub fn empty() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    /// Adds or replaces a named constructor
    pub fn register<F>(&mut self, name: impl Into<String>, builder: F)
    where
        F: Fn(&[JsonValue]) -> StructureResult<Filter> + Send + Sync + 'static,
    {
        self.builders.insert(name.into(), Arc::new(builder));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }

    /// Builds the named filter
    pub fn build(&self, name: &str, args: &[JsonValue]) -> StructureResult<Filter> {
        let builder = self
            .builders
            .get(name)
            .ok_or_else(|| StructureError::new(format!("Unknown filter '{}'.", name)))?;
        builder(args)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.builders.keys()).finish()
    }
}

fn arg<'a>(args: &'a [JsonValue], index: usize, filter: &str) -> StructureResult<&'a JsonValue> {
    args.get(index).ok_or_else(|| {
        StructureError::new(format!(
            "Filter '{}': missing argument {}.",
            filter,
            index + 1
        ))
    })
}

fn bad_arg(filter: &str, index: usize, expected: &str) -> StructureError {
    StructureError::new(format!(
        "Filter '{}': argument {} must be {}.",
        filter,
        index + 1,
        expected
    ))
}

fn arg_f64(args: &[JsonValue], index: usize, filter: &str) -> StructureResult<f64> {
    arg(args, index, filter)?
        .as_f64()
        .ok_or_else(|| bad_arg(filter, index, "a number"))
}

fn arg_usize(args: &[JsonValue], index: usize, filter: &str) -> StructureResult<usize> {
    arg(args, index, filter)?
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| bad_arg(filter, index, "a non-negative integer"))
}

fn arg_str<'a>(args: &'a [JsonValue], index: usize, filter: &str) -> StructureResult<&'a str> {
    arg(args, index, filter)?
        .as_str()
        .ok_or_else(|| bad_arg(filter, index, "a string"))
}

fn arg_datetime(args: &[JsonValue], index: usize, filter: &str) -> StructureResult<DateTime<Utc>> {
    let raw = arg_str(args, index, filter)?;
    filters::to_datetime(&Value::from(raw)).ok_or_else(|| bad_arg(filter, index, "a date"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalogue_names() {
        let registry = FilterRegistry::new();
        for name in ["min_length", "to_lower_case", "matches", "email", "range"] {
            assert!(registry.contains(name), "missing {}", name);
        }
        assert!(!registry.contains("string"));
    }

    #[test]
    fn test_build_with_args() {
        let registry = FilterRegistry::new();
        let f = registry.build("range", &[json!(1), json!(5)]).unwrap();
        assert!(f.apply(Value::Integer(3)).is_ok());
        assert!(f.apply(Value::Integer(9)).is_err());
    }

    #[test]
    fn test_unknown_filter() {
        let err = FilterRegistry::new().build("shout", &[]).unwrap_err();
        assert_eq!(err.message(), "Unknown filter 'shout'.");
    }

    #[test]
    fn test_missing_and_bad_args() {
        let registry = FilterRegistry::new();
        let err = registry.build("min", &[]).unwrap_err();
        assert!(err.message().contains("missing argument 1"));

        let err = registry.build("max_length", &[json!(-2)]).unwrap_err();
        assert!(err.message().contains("non-negative integer"));
    }

    #[test]
    fn test_invalid_regex() {
        let err = FilterRegistry::new()
            .build("matches", &[json!("(unclosed")])
            .unwrap_err();
        assert!(err.message().contains("invalid pattern"));
    }

    #[test]
    fn test_after_parses_date_argument() {
        let f = FilterRegistry::new()
            .build("after", &[json!("2020-01-01")])
            .unwrap();
        assert!(f.apply(Value::from("2021-06-01")).is_ok());
        assert!(f.apply(Value::from("2019-06-01")).is_err());
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = FilterRegistry::empty();
        registry.register("shout", |_| Ok(filters::to_upper_case()));
        let f = registry.build("shout", &[]).unwrap();
        assert_eq!(f.apply(Value::from("hi")).unwrap(), Value::from("HI"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["shout"]);
    }
}
