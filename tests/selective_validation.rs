//! Selective Validation Tests
//!
//! Tests for change-aware re-validation:
//! - Only touched top-level fields are re-validated
//! - A touched leaf re-validates its whole top-level field
//! - Untouched fields pass through unvalidated and unchanged
//! - Change tracking enumerates every path of a replaced subtree

use docshape::schema::{field, mark_changed, schema, ChangedPaths, Schema};
use docshape::value::{document_from_json, Document, Value};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn doc(value: serde_json::Value) -> Document {
    document_from_json(value).unwrap()
}

fn profile_schema() -> Schema {
    schema(vec![
        ("a", field("a").unwrap().string().unwrap()),
        (
            "b",
            field("b")
                .unwrap()
                .object_of(vec![("c", field("c").unwrap().string().unwrap())])
                .unwrap(),
        ),
        (
            "tags",
            field("tags")
                .unwrap()
                .array_of(field("tag").unwrap().string().unwrap().to_lower_case())
                .unwrap()
                .optional(),
        ),
    ])
}

// =============================================================================
// Selective Validation
// =============================================================================

/// A changed leaf re-validates its entire top-level field; siblings pass through.
#[tokio::test]
async fn test_changed_leaf_revalidates_top_level_field() {
    let input = doc(json!({ "a": 1, "b": { "c": "x", "d": "ignored" } }));
    let changed: ChangedPaths = ["b.c"].into_iter().collect();

    let out = profile_schema()
        .validate_selected(&input, &changed)
        .await
        .unwrap();

    assert_eq!(out, doc(json!({ "a": 1, "b": { "c": "x" } })));
}

/// Full validation of the same document rejects the untouched field.
#[tokio::test]
async fn test_full_validation_checks_everything() {
    let input = doc(json!({ "a": 1, "b": { "c": "x" } }));
    let err = profile_schema().validate(&input).await.unwrap_err();
    assert_eq!(err.as_validation().unwrap().message(), "a must be a String.");
}

/// Repeated validation of the same input yields the same result.
#[tokio::test]
async fn test_validation_is_deterministic() {
    let s = profile_schema();
    let input = doc(json!({ "a": "x", "b": { "c": "y" }, "tags": ["A", "B"] }));

    let first = s.validate(&input).await.unwrap();
    for _ in 0..50 {
        assert_eq!(s.validate(&input).await.unwrap(), first);
    }
    assert_eq!(first.get("tags"), Some(&Value::from(json!(["a", "b"]))));
}

/// Schemas are shareable across concurrent validations.
#[tokio::test]
async fn test_concurrent_validations_share_schema() {
    let s = std::sync::Arc::new(profile_schema());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let s = std::sync::Arc::clone(&s);
            tokio::spawn(async move {
                let input = doc(json!({ "a": format!("user{}", i), "b": { "c": "x" } }));
                s.validate(&input).await
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let out = handle.await.unwrap().unwrap();
        assert_eq!(out.get("a"), Some(&Value::from(format!("user{}", i))));
    }
}

// =============================================================================
// Change Tracking Driving Validation
// =============================================================================

/// Replacing a subtree marks every path under it.
#[test]
fn test_subtree_replacement_marks_leaves() {
    let mut changed = ChangedPaths::new();
    mark_changed::<&str>(
        &mut changed,
        &Value::from(json!({ "p": { "q": 1 } })),
        &[],
    );

    assert!(changed.contains("p.q"));
    assert!(!changed.contains(""));
}

/// Paths recorded for a write select the right fields for re-validation.
#[tokio::test]
async fn test_tracked_write_selects_field() {
    let input = doc(json!({ "a": "ok", "b": { "c": 5 } }));

    let mut changed = ChangedPaths::new();
    mark_changed(&mut changed, &Value::from("ok"), &["a"]);
    let out = profile_schema()
        .validate_selected(&input, &changed)
        .await
        .unwrap();
    // `b` is invalid but was not touched
    assert_eq!(out, input);

    mark_changed(&mut changed, &Value::from(5), &["b", "c"]);
    let err = profile_schema()
        .validate_selected(&input, &changed)
        .await
        .unwrap_err();
    assert_eq!(err.as_validation().unwrap().message(), "c must be a String.");
}
