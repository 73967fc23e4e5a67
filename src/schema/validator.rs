//! Schema: named Fields validated as one document
//!
//! Validation semantics:
//! - Every declared field is validated against the matching key
//! - Undeclared keys are dropped from the result
//! - Fields resolving to absent are omitted
//!
//! Selective validation re-validates only the top-level fields touched by a
//! set of changed paths and merges them over a shallow copy of the input.
//! Untouched fields pass through unvalidated.

use std::collections::BTreeMap;

use super::changes::ChangedPaths;
use super::errors::{SchemaResult, StructureError, ValidationError, ValidationResult};
use super::field::{validate_entries, Field};
use crate::observability::{Event, Logger, ObservationScope};
use crate::value::{Document, Value};

/// A document schema. Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, Field>,
}

/// Creates a Schema from `(name, Field)` pairs.
pub fn schema<I, K>(fields: I) -> Schema
where
    I: IntoIterator<Item = (K, Field)>,
    K: Into<String>,
{
    Schema::new(fields)
}

impl Schema {
    pub fn new<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Field)>,
        K: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(|(k, f)| (k.into(), f)).collect(),
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, Field> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validates an arbitrary value; anything but an object is a structure error.
    pub async fn validate_value(&self, document: &Value) -> SchemaResult<Document> {
        match document {
            Value::Object(doc) => self.validate(doc).await,
            other => Err(StructureError::not_a_document(other.type_name()).into()),
        }
    }

    /// Validates every declared field.
    pub async fn validate(&self, document: &Document) -> SchemaResult<Document> {
        let scope = ObservationScope::with_fields(
            Event::SchemaValidate,
            vec![("fields", self.fields.len().to_string())],
        );

        let mut input = document.clone();
        match validate_entries(&self.fields, &mut input).await {
            Ok(validated) => {
                scope.complete();
                Ok(validated)
            }
            Err(e) => {
                log_rejection(&e);
                scope.fail(e.message());
                Err(e.into())
            }
        }
    }

    /// Selective form of [`Schema::validate_value`].
    pub async fn validate_selected_value(
        &self,
        document: &Value,
        changed: &ChangedPaths,
    ) -> SchemaResult<Document> {
        match document {
            Value::Object(doc) => self.validate_selected(doc, changed).await,
            other => Err(StructureError::not_a_document(other.type_name()).into()),
        }
    }

    /// Re-validates the top-level fields named by `changed` and merges the
    /// result over a copy of `document`. Names with no declared field are ignored.
    pub async fn validate_selected(
        &self,
        document: &Document,
        changed: &ChangedPaths,
    ) -> SchemaResult<Document> {
        let selected: Vec<(&String, &Field)> = changed
            .top_level()
            .iter()
            .filter_map(|name| self.fields.get_key_value(name.as_str()))
            .collect();

        let scope = ObservationScope::with_fields(
            Event::SchemaValidateSelected,
            vec![("fields", selected.len().to_string())],
        );

        match self.merge_selected(document, &selected).await {
            Ok(merged) => {
                scope.complete();
                Ok(merged)
            }
            Err(e) => {
                log_rejection(&e);
                scope.fail(e.message());
                Err(e.into())
            }
        }
    }

    async fn merge_selected(
        &self,
        document: &Document,
        selected: &[(&String, &Field)],
    ) -> ValidationResult<Document> {
        let mut input: Document = selected
            .iter()
            .filter_map(|(name, _)| document.get(*name).map(|v| ((*name).clone(), v.clone())))
            .collect();

        let validated = validate_entries(selected.iter().copied(), &mut input).await?;

        let mut merged = document.clone();
        for (name, _) in selected {
            match validated.get(*name) {
                Some(value) => merged.insert((*name).clone(), value.clone()),
                None => merged.remove(*name),
            };
        }
        Ok(merged)
    }
}

fn log_rejection(err: &ValidationError) {
    Logger::trace(
        Event::FieldRejected.as_str(),
        &[
            ("field", err.label().unwrap_or("")),
            ("message", err.message()),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::field;
    use crate::schema::SchemaError;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        match Value::from(value) {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other.type_name()),
        }
    }

    fn sample_schema() -> Schema {
        schema(vec![
            ("a", field("a").unwrap().string().unwrap()),
            (
                "b",
                field("b")
                    .unwrap()
                    .object_of(vec![("c", field("c").unwrap().string().unwrap())])
                    .unwrap(),
            ),
        ])
    }

    #[tokio::test]
    async fn test_validate_drops_undeclared_keys() {
        let s = schema(vec![("name", field("name").unwrap().string().unwrap().trim())]);
        let out = s
            .validate(&doc(json!({ "name": "  Ada ", "extra": 1 })))
            .await
            .unwrap();
        assert_eq!(out, doc(json!({ "name": "Ada" })));
    }

    #[tokio::test]
    async fn test_validate_omits_absent_optional() {
        let s = schema(vec![
            ("name", field("name").unwrap().string().unwrap()),
            ("nick", field("nick").unwrap().string().unwrap().optional()),
        ]);
        let out = s.validate(&doc(json!({ "name": "Ada" }))).await.unwrap();
        assert!(!out.contains_key("nick"));
    }

    #[tokio::test]
    async fn test_validate_required_failure() {
        let s = schema(vec![("email", field("email").unwrap().email())]);
        let err = s.validate(&Document::new()).await.unwrap_err();
        assert_eq!(err.code(), "DOC_VALIDATION_FAILED");
        assert_eq!(err.as_validation().unwrap().message(), "email is required.");
    }

    #[tokio::test]
    async fn test_non_object_is_structure_error() {
        let err = sample_schema()
            .validate_value(&Value::from("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::Structure(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_selected_revalidates_whole_top_level_field() {
        let input = doc(json!({ "a": 1, "b": { "c": "x", "d": "ignored" } }));
        let changed: ChangedPaths = ["b.c"].into_iter().collect();

        let out = sample_schema().validate_selected(&input, &changed).await.unwrap();

        // `a` is invalid but untouched, so it passes through unchanged
        assert_eq!(out, doc(json!({ "a": 1, "b": { "c": "x" } })));
    }

    #[tokio::test]
    async fn test_selected_with_no_changes_is_copy() {
        let input = doc(json!({ "a": 1, "zzz": true }));
        let out = sample_schema()
            .validate_selected(&input, &ChangedPaths::new())
            .await
            .unwrap();
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn test_selected_failure_on_touched_field() {
        let input = doc(json!({ "a": 1, "b": { "c": "x" } }));
        let changed: ChangedPaths = ["a"].into_iter().collect();
        let err = sample_schema().validate_selected(&input, &changed).await.unwrap_err();
        assert_eq!(err.as_validation().unwrap().message(), "a must be a String.");
    }

    #[tokio::test]
    async fn test_selected_ignores_undeclared_names() {
        let input = doc(json!({ "a": "ok", "other": 5 }));
        let changed: ChangedPaths = ["other", "a"].into_iter().collect();
        let out = sample_schema().validate_selected(&input, &changed).await.unwrap();
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn test_selected_removes_absent_optional() {
        let s = schema(vec![(
            "nick",
            field("nick").unwrap().string().unwrap().optional(),
        )]);
        let mut input = Document::new();
        input.insert("nick".to_string(), Value::Undefined);
        let changed: ChangedPaths = ["nick"].into_iter().collect();

        let out = s.validate_selected(&input, &changed).await.unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_accessors() {
        let s = sample_schema();
        assert_eq!(s.len(), 2);
        assert!(s.contains("a"));
        assert_eq!(s.field("b").unwrap().label(), "b");
        assert!(s.field("zzz").is_none());
    }
}
