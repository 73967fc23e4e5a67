//! Conversions between `Value` and `serde_json::Value`
//!
//! Opaque types serialise to tagged objects:
//! - reference: `{"$ref": "collection/id"}`
//! - geopoint: `{"$geo": [lat, lng]}`
//! - timestamp: RFC 3339 string

use serde_json::{json, Map};

use super::{Document, Value};

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Value {
    /// Converts to JSON. `Undefined` and non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => json!(b),
            Value::Integer(i) => json!(i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => json!(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => document_to_json(map),
            Value::Reference(r) => json!({ "$ref": r.path() }),
            Value::GeoPoint(p) => json!({ "$geo": [p.latitude, p.longitude] }),
            Value::Timestamp(t) => json!(t.to_rfc3339()),
        }
    }
}

/// Converts a document to a JSON object.
pub fn document_to_json(doc: &Document) -> serde_json::Value {
    let map: Map<String, serde_json::Value> = doc
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    serde_json::Value::Object(map)
}

/// Converts a JSON value into a document. Returns `None` unless it is an object.
pub fn document_from_json(value: serde_json::Value) -> Option<Document> {
    match Value::from(value) {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
