//! Declarative schema definitions
//!
//! ```json
//! {
//!   "description": "Registered users",
//!   "fields": {
//!     "email": { "type": "string", "filters": [{ "name": "email" }] },
//!     "age": { "type": "integer", "optional": true,
//!              "filters": [{ "name": "min", "args": [0], "message": "{label} cannot be negative" }] },
//!     "tags": { "type": "array", "items": { "type": "string" } },
//!     "role": { "type": "one_of", "values": ["admin", "member"], "default": "member" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::errors::{StructureError, StructureResult};
use super::field::Field;
use super::registry::FilterRegistry;
use super::validator::Schema;
use crate::value::Value;

/// Field type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Any,
    Array,
    Boolean,
    Integer,
    Number,
    Object,
    String,
    Reference,
    Geopoint,
    Timestamp,
    Date,
    OneOf,
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Any => "any",
            FieldKind::Array => "array",
            FieldKind::Boolean => "boolean",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Object => "object",
            FieldKind::String => "string",
            FieldKind::Reference => "reference",
            FieldKind::Geopoint => "geopoint",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Date => "date",
            FieldKind::OneOf => "one_of",
        }
    }
}

/// One entry of a field's filter list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<JsonValue>,
    /// Replaces the filter's error template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Declarative form of a [`Field`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FieldKind>,
    /// Label used in messages; defaults to the field name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    /// Date format (`date` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterSpec>,
    /// Nested fields (`object` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, FieldSpec>>,
    /// Element field (`array` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldSpec>>,
    /// Accepted literals (`one_of` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<JsonValue>>,
}

impl FieldSpec {
    /// Builds the Field; `name` is the label unless one is given.
    pub fn build(&self, name: &str, registry: &FilterRegistry) -> StructureResult<Field> {
        let label = self.label.as_deref().unwrap_or(name);
        self.check_options(label)?;

        let mut field = Field::new(label)?;

        field = match self.kind {
            None => field,
            Some(FieldKind::Any) => field.any()?,
            Some(FieldKind::Boolean) => field.boolean()?,
            Some(FieldKind::Integer) => field.integer()?,
            Some(FieldKind::Number) => field.number()?,
            Some(FieldKind::String) => field.string()?,
            Some(FieldKind::Reference) => field.reference()?,
            Some(FieldKind::Geopoint) => field.geopoint()?,
            Some(FieldKind::Timestamp) => field.timestamp()?,
            Some(FieldKind::Date) => field.date(self.format.as_deref())?,
            Some(FieldKind::Object) => match &self.fields {
                Some(specs) => {
                    let nested = specs
                        .iter()
                        .map(|(key, spec)| Ok((key.clone(), spec.build(key, registry)?)))
                        .collect::<StructureResult<Vec<_>>>()?;
                    field.object_of(nested)?
                }
                None => field.object()?,
            },
            Some(FieldKind::Array) => match &self.items {
                Some(item) => field.array_of(item.build(label, registry)?)?,
                None => field.array()?,
            },
            Some(FieldKind::OneOf) => {
                let values = self.values.as_ref().ok_or_else(|| {
                    StructureError::new(format!("Field '{}': one_of requires 'values'.", label))
                })?;
                field.one_of(values.iter().cloned().map(Value::from).collect())?
            }
        };

        if self.nullable {
            field = field.nullable();
        }
        if self.optional {
            field = field.optional();
        }
        if let Some(default) = &self.default {
            field = field.default(Value::from(default.clone()));
        }

        for spec in &self.filters {
            let mut filter = registry.build(&spec.name, &spec.args)?;
            if let Some(message) = &spec.message {
                filter = filter.with_message(message.clone());
            }
            field = field.filter(filter);
        }

        Ok(field)
    }

    /// Rejects keys that do not belong to the selected type.
    fn check_options(&self, label: &str) -> StructureResult<()> {
        let kind = self.kind;
        let misplaced = |key: &str, owner: FieldKind| {
            StructureError::new(format!(
                "Field '{}': '{}' is only valid for type '{}'.",
                label,
                key,
                owner.type_name()
            ))
        };

        if self.fields.is_some() && kind != Some(FieldKind::Object) {
            return Err(misplaced("fields", FieldKind::Object));
        }
        if self.items.is_some() && kind != Some(FieldKind::Array) {
            return Err(misplaced("items", FieldKind::Array));
        }
        if self.values.is_some() && kind != Some(FieldKind::OneOf) {
            return Err(misplaced("values", FieldKind::OneOf));
        }
        if self.format.is_some() && kind != Some(FieldKind::Date) {
            return Err(misplaced("format", FieldKind::Date));
        }
        Ok(())
    }
}

/// Declarative form of a [`Schema`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: BTreeMap<String, FieldSpec>,
}

impl SchemaDef {
    pub fn build(&self, registry: &FilterRegistry) -> StructureResult<Schema> {
        let fields = self
            .fields
            .iter()
            .map(|(name, spec)| Ok((name.clone(), spec.build(name, registry)?)))
            .collect::<StructureResult<Vec<_>>>()?;
        Ok(Schema::new(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::Outcome;
    use serde_json::json;

    fn spec(value: JsonValue) -> FieldSpec {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_string_with_filters() {
        let f = spec(json!({
            "type": "string",
            "filters": [{ "name": "trim" }, { "name": "min_length", "args": [2] }]
        }))
        .build("name", &FilterRegistry::new())
        .unwrap();

        assert_eq!(f.stage_names(), vec!["string", "trim", "min_length"]);
        assert_eq!(
            f.validate(Some(Value::from(" Ada "))).await.unwrap(),
            Outcome::Present(Value::from("Ada"))
        );
        let err = f.validate(Some(Value::from(" A "))).await.unwrap_err();
        assert_eq!(err.message(), "name must have length of at least 2.");
    }

    #[tokio::test]
    async fn test_filter_message_override() {
        let f = spec(json!({
            "type": "integer",
            "filters": [{ "name": "min", "args": [0], "message": "{label} cannot be negative" }]
        }))
        .build("age", &FilterRegistry::new())
        .unwrap();

        let err = f.validate(Some(Value::Integer(-3))).await.unwrap_err();
        assert_eq!(err.message(), "age cannot be negative");
    }

    #[tokio::test]
    async fn test_nested_object_and_array() {
        let f = spec(json!({
            "type": "object",
            "fields": {
                "city": { "type": "string" },
                "tags": { "type": "array", "items": { "type": "string", "optional": true } }
            }
        }))
        .build("address", &FilterRegistry::new())
        .unwrap();

        let input = Value::from(json!({ "city": "Lyon", "tags": ["a"], "x": 1 }));
        assert_eq!(
            f.validate(Some(input)).await.unwrap(),
            Outcome::Present(Value::from(json!({ "city": "Lyon", "tags": ["a"] })))
        );
    }

    #[tokio::test]
    async fn test_one_of_with_default() {
        let f = spec(json!({ "type": "one_of", "values": ["admin", "member"], "default": "member" }))
            .build("role", &FilterRegistry::new())
            .unwrap();

        assert_eq!(
            f.validate(None).await.unwrap(),
            Outcome::Present(Value::from("member"))
        );
        assert!(f.validate(Some(Value::from("root"))).await.is_err());
    }

    #[test]
    fn test_one_of_without_values() {
        let err = spec(json!({ "type": "one_of" }))
            .build("role", &FilterRegistry::new())
            .unwrap_err();
        assert!(err.message().contains("requires 'values'"));
    }

    #[test]
    fn test_misplaced_keys() {
        let err = spec(json!({ "type": "string", "items": { "type": "string" } }))
            .build("name", &FilterRegistry::new())
            .unwrap_err();
        assert!(err.message().contains("'items' is only valid for type 'array'"));
    }

    #[test]
    fn test_unknown_keys_rejected_by_serde() {
        let result: Result<FieldSpec, _> = serde_json::from_value(json!({ "typ": "string" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_filter() {
        let err = spec(json!({ "filters": [{ "name": "nope" }] }))
            .build("x", &FilterRegistry::new())
            .unwrap_err();
        assert_eq!(err.message(), "Unknown filter 'nope'.");
    }

    #[test]
    fn test_schema_def_build() {
        let def: SchemaDef = serde_json::from_value(json!({
            "fields": {
                "name": { "type": "string" },
                "age": { "type": "integer", "optional": true, "label": "Age" }
            }
        }))
        .unwrap();

        let schema = def.build(&FilterRegistry::new()).unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.field("age").unwrap().label(), "Age");
        assert!(schema.field("age").unwrap().is_optional());
    }

    #[test]
    fn test_kind_names_match_serde() {
        for kind in [FieldKind::OneOf, FieldKind::Geopoint, FieldKind::String] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, JsonValue::String(kind.type_name().to_string()));
        }
    }
}
