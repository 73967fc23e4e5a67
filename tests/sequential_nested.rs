//! Sequential Nested Validation Tests
//!
//! Tests for `concurrent_nested = false` applied through configuration:
//! - Applying a config changes the process-wide settings
//! - Sequential and concurrent validation produce the same output
//! - Elements are visited in index order and stop at the first failure
//!
//! Settings are process-wide, so this file is its own test binary and its
//! tests hold `SETTINGS` while they run.

use std::sync::{Arc, Mutex};

use docshape::config::{self, ValidatorConfig};
use docshape::observability::{Logger, Severity};
use docshape::schema::{field, schema, Field, Schema};
use docshape::value::{document_from_json, Document, Value};
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;

static SETTINGS: AsyncMutex<()> = AsyncMutex::const_new(());

// =============================================================================
// Helper Functions
// =============================================================================

fn doc(value: serde_json::Value) -> Document {
    document_from_json(value).unwrap()
}

fn apply(concurrent_nested: bool) {
    let config = ValidatorConfig::from_json(
        &json!({ "concurrent_nested": concurrent_nested, "log_level": "error" }).to_string(),
    )
    .unwrap();
    config.apply().unwrap();
}

fn team_schema() -> Schema {
    schema(vec![
        ("name", field("name").unwrap().string().unwrap().trim()),
        (
            "lead",
            field("lead")
                .unwrap()
                .object_of(vec![
                    ("email", field("email").unwrap().email()),
                    ("nick", field("nick").unwrap().string().unwrap().optional()),
                ])
                .unwrap(),
        ),
        (
            "members",
            field("members")
                .unwrap()
                .array_of(
                    field("member")
                        .unwrap()
                        .object_of(vec![(
                            "age",
                            field("age").unwrap().integer().unwrap().min(0.0),
                        )])
                        .unwrap(),
                )
                .unwrap(),
        ),
    ])
}

/// Element field recording every value it sees, failing on negatives
fn recording_item(seen: Arc<Mutex<Vec<i64>>>) -> Field {
    field("score")
        .unwrap()
        .integer()
        .unwrap()
        .custom_async(move |v| {
            let seen = Arc::clone(&seen);
            async move {
                if let Value::Integer(n) = v {
                    seen.lock().unwrap().push(n);
                }
                Ok(v)
            }
        })
        .min(0.0)
}

// =============================================================================
// Configuration
// =============================================================================

/// Applying a config updates the logger threshold and the nested mode.
#[tokio::test]
async fn test_apply_sets_process_settings() {
    let _settings = SETTINGS.lock().await;
    apply(false);

    assert_eq!(Logger::min_severity(), Severity::Error);
    assert!(!config::concurrent_nested());
}

// =============================================================================
// Sequential Validation
// =============================================================================

/// Sequential validation yields the same document as concurrent validation.
#[tokio::test]
async fn test_sequential_matches_concurrent() {
    let _settings = SETTINGS.lock().await;
    let input = doc(json!({
        "name": "  Core ",
        "lead": { "email": "Lead@Team.io", "extra": true },
        "members": [{ "age": 30 }, { "age": 41, "role": "x" }]
    }));
    let s = team_schema();

    apply(true);
    let concurrent = s.validate(&input).await.unwrap();

    apply(false);
    let sequential = s.validate(&input).await.unwrap();

    assert_eq!(sequential, concurrent);
    assert_eq!(
        sequential,
        doc(json!({
            "name": "Core",
            "lead": { "email": "lead@team.io" },
            "members": [{ "age": 30 }, { "age": 41 }]
        }))
    );
}

/// Elements run in index order and the first failing element's error surfaces.
#[tokio::test]
async fn test_sequential_stops_at_first_failure() {
    let _settings = SETTINGS.lock().await;
    apply(false);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let f = field("scores")
        .unwrap()
        .array_of(recording_item(Arc::clone(&seen)))
        .unwrap();

    let input = Value::from(json!([4, 7, -1, -2, 9]));
    let err = f.validate(Some(input)).await.unwrap_err();

    assert_eq!(err.message(), "score must be a Number greater than or equal to 0.");
    assert_eq!(*seen.lock().unwrap(), vec![4, 7, -1]);
}

/// Nested object failures surface with the nested label in sequential mode.
#[tokio::test]
async fn test_sequential_nested_object_failure() {
    let _settings = SETTINGS.lock().await;
    apply(false);

    let err = team_schema()
        .validate(&doc(json!({
            "name": "Core",
            "lead": { "email": "nope" },
            "members": [{ "age": -3 }]
        })))
        .await
        .unwrap_err();

    // keys are visited in order, so `lead` fails before `members`
    assert_eq!(err.as_validation().unwrap().message(), "email must be a valid email.");
}
