//! Document data model for docshape
//!
//! The validator works on a closed, owned value tree:
//! - Plain data: null, booleans, numbers, strings, arrays, objects
//! - Opaque store types: document references, geographic points, timestamps
//! - `Undefined`: a slot that exists but was never assigned
//!
//! Objects are ordered maps so iteration and output are deterministic.

mod json;

pub use json::{document_from_json, document_to_json};

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A document (or nested object): field name to value, ordered by key.
pub type Document = BTreeMap<String, Value>;

/// Reference to another document in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Collection path the referenced document lives in
    pub collection: String,
    /// Document ID within the collection
    pub id: String,
}

impl DocumentRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Returns the full `collection/id` path
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

/// Geographic point (latitude, longitude in degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A value stored in a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Slot that was never assigned (e.g. a hole left by a sparse array write)
    Undefined,
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(Document),
    Reference(DocumentRef),
    GeoPoint(GeoPoint),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns the type name for error messages and logs
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Reference(_) => "reference",
            Value::GeoPoint(_) => "geopoint",
            Value::Timestamp(_) => "timestamp",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for arrays and objects
    pub fn is_compound(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// True for booleans, numbers and strings
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Integer(_) | Value::Float(_) | Value::String(_)
        )
    }

    /// Numeric view of the value. NaN is not a number here.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Document> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Length of a string (in chars) or an array
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Reference(r) => write!(f, "{}", r.path()),
            Value::GeoPoint(p) => write!(f, "({}, {})", p.latitude, p.longitude),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Array(_) | Value::Object(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Document> for Value {
    fn from(map: Document) -> Self {
        Value::Object(map)
    }
}

impl From<DocumentRef> for Value {
    fn from(r: DocumentRef) -> Self {
        Value::Reference(r)
    }
}

impl From<GeoPoint> for Value {
    fn from(p: GeoPoint) -> Self {
        Value::GeoPoint(p)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

/// Splits a dot path into its segments, skipping empty ones.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

/// Reads the value at a dot path (`"address.city"`, `"tags.0"`).
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let segments = split_path(path);
    let (first, rest) = segments.split_first()?;
    let mut current = doc.get(*first)?;

    for segment in rest {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Largest number of `Undefined` holes a single array write may add
pub const MAX_ARRAY_PADDING: usize = 1024;

/// Whether [`set_path`] would accept `path` for this document.
///
/// False for an empty path, or when an array index lies more than
/// [`MAX_ARRAY_PADDING`] slots past the end of an existing array.
pub fn can_set_path(doc: &Document, path: &str) -> bool {
    let segments = split_path(path);
    let Some((first, rest)) = segments.split_first() else {
        return false;
    };

    match doc.get(*first) {
        Some(slot) => writable(slot, rest),
        None => true,
    }
}

fn writable(slot: &Value, segments: &[&str]) -> bool {
    let Some((segment, rest)) = segments.split_first() else {
        return true;
    };

    match slot {
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(index) if index < items.len() => writable(&items[index], rest),
            Ok(index) => index - items.len() <= MAX_ARRAY_PADDING,
            // non-numeric segment replaces the array with an object
            Err(_) => true,
        },
        Value::Object(map) => map.get(*segment).map_or(true, |child| writable(child, rest)),
        _ => true,
    }
}

/// Writes a value at a dot path.
///
/// Missing or scalar intermediates become objects. Numeric segments index
/// into arrays; writing past the end pads the array with `Undefined`.
/// Returns false, leaving the document untouched, when [`can_set_path`]
/// rejects the path.
pub fn set_path(doc: &mut Document, path: &str, value: Value) -> bool {
    if !can_set_path(doc, path) {
        return false;
    }

    let segments = split_path(path);
    let Some((first, rest)) = segments.split_first() else {
        return false;
    };

    let slot = doc.entry((*first).to_string()).or_insert(Value::Undefined);
    write_into(slot, rest, value);
    true
}

fn write_into(slot: &mut Value, segments: &[&str], value: Value) {
    let Some((segment, rest)) = segments.split_first() else {
        *slot = value;
        return;
    };

    if let (Value::Array(items), Ok(index)) = (&mut *slot, segment.parse::<usize>()) {
        if index >= items.len() {
            items.resize(index.saturating_add(1), Value::Undefined);
        }
        write_into(&mut items[index], rest, value);
        return;
    }

    if !matches!(slot, Value::Object(_)) {
        *slot = Value::Object(Document::new());
    }
    if let Value::Object(map) = slot {
        let child = map
            .entry((*segment).to_string())
            .or_insert(Value::Undefined);
        write_into(child, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut address = Document::new();
        address.insert("city".into(), Value::from("Lyon"));

        let mut doc = Document::new();
        doc.insert("address".into(), Value::Object(address));
        doc.insert(
            "tags".into(),
            Value::Array(vec![Value::from("a"), Value::from("b")]),
        );
        doc
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from(1).type_name(), "integer");
        assert_eq!(Value::from(1.5).type_name(), "number");
        assert_eq!(Value::Undefined.type_name(), "undefined");
        assert_eq!(
            Value::from(GeoPoint::new(1.0, 2.0)).type_name(),
            "geopoint"
        );
    }

    #[test]
    fn test_nan_is_not_numeric() {
        assert_eq!(Value::Float(f64::NAN).as_f64(), None);
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
    }

    #[test]
    fn test_len_counts_chars() {
        assert_eq!(Value::from("héllo").len(), Some(5));
        assert_eq!(Value::Array(vec![Value::Null]).len(), Some(1));
        assert_eq!(Value::Bool(true).len(), None);
    }

    #[test]
    fn test_get_path() {
        let doc = sample();
        assert_eq!(get_path(&doc, "address.city"), Some(&Value::from("Lyon")));
        assert_eq!(get_path(&doc, "tags.1"), Some(&Value::from("b")));
        assert_eq!(get_path(&doc, "tags.9"), None);
        assert_eq!(get_path(&doc, "address.zip"), None);
        assert_eq!(get_path(&doc, ""), None);
    }

    #[test]
    fn test_set_path_creates_intermediate_objects() {
        let mut doc = Document::new();
        assert!(set_path(&mut doc, "a.b.c", Value::from(1)));
        assert_eq!(get_path(&doc, "a.b.c"), Some(&Value::from(1)));
    }

    #[test]
    fn test_set_path_pads_arrays_with_undefined() {
        let mut doc = sample();
        set_path(&mut doc, "tags.3", Value::from("d"));

        let tags = doc["tags"].as_array().unwrap();
        assert_eq!(tags.len(), 4);
        assert!(tags[2].is_undefined());
        assert_eq!(tags[3], Value::from("d"));
    }

    #[test]
    fn test_set_path_rejects_far_array_index() {
        let mut doc = sample();
        let before = doc.clone();

        assert!(!set_path(&mut doc, "tags.18446744073709551615", Value::from("x")));
        assert!(!set_path(&mut doc, "tags.10000000000", Value::from("x")));
        assert_eq!(doc, before);

        let edge = 2 + MAX_ARRAY_PADDING;
        assert!(can_set_path(&doc, &format!("tags.{}", edge)));
        assert!(!can_set_path(&doc, &format!("tags.{}", edge + 1)));
    }

    #[test]
    fn test_set_path_empty_is_rejected() {
        let mut doc = Document::new();
        assert!(!set_path(&mut doc, "", Value::Null));
        assert!(doc.is_empty());
    }
}
