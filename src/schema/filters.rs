//! Filter library
//!
//! Each constructor takes its configuration and returns a `Filter`: a pure
//! `Value -> Value` stage that passes the value through (possibly
//! transformed) or fails with a `ValidationError` whose message carries the
//! `{label}` placeholder. Constructors are stateless; identical arguments
//! yield equivalent filters.

use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;

use super::errors::{StructureError, StructureResult, ValidationError, ValidationResult};
use crate::value::Value;

/// Signature of a synchronous pipeline stage
pub type FilterFn = dyn Fn(Value) -> ValidationResult<Value> + Send + Sync;

/// Types accepted by the `any` guard, in message order
pub const STORE_TYPES: [&str; 8] = [
    "Array",
    "Map",
    "Boolean",
    "Number",
    "DocumentReference",
    "GeoPoint",
    "String",
    "Timestamp",
];

/// ASCII-only word classes
const EMAIL_PATTERN: &str = r"^[-A-Za-z0-9.+_]+@[-A-Za-z0-9.+_]+\.[A-Za-z0-9_]{2,}$";

/// A named pipeline stage.
#[derive(Clone)]
pub struct Filter {
    name: String,
    func: Arc<FilterFn>,
}

impl Filter {
    /// Wraps a function as a filter
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value) -> ValidationResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Replaces the error template of this filter
    pub fn with_message(self, template: impl Into<String>) -> Self {
        let template = template.into();
        let inner = self.func;
        Self {
            name: self.name,
            func: Arc::new(move |value| {
                inner(value).map_err(|_| ValidationError::new(template.clone()))
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the filter against a value
    pub fn apply(&self, value: Value) -> ValidationResult<Value> {
        (self.func)(value)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("name", &self.name).finish()
    }
}

/// Builds a filter that passes values satisfying `accepts` unchanged.
fn guard<P>(name: &str, message: impl Into<String>, accepts: P) -> Filter
where
    P: Fn(&Value) -> bool + Send + Sync + 'static,
{
    let message = message.into();
    Filter::new(name, move |value| {
        if accepts(&value) {
            Ok(value)
        } else {
            Err(ValidationError::new(message.clone()))
        }
    })
}

/// Builds a filter that maps strings and fails on anything else.
fn string_transform<T>(name: &str, message: impl Into<String>, transform: T) -> Filter
where
    T: Fn(&str) -> String + Send + Sync + 'static,
{
    let message = message.into();
    Filter::new(name, move |value| match value {
        Value::String(s) => Ok(Value::String(transform(&s))),
        _ => Err(ValidationError::new(message.clone())),
    })
}

// ---------------------------------------------------------------------------
// Type guards
// ---------------------------------------------------------------------------

pub fn any() -> Filter {
    guard(
        "any",
        format!(
            "{{label}} must be of one of the types accepted by the store: {}.",
            STORE_TYPES.join(", ")
        ),
        is_any,
    )
}

pub fn array() -> Filter {
    guard("array", "{label} must be an Array.", |v| {
        matches!(v, Value::Array(_))
    })
}

pub fn boolean() -> Filter {
    guard("boolean", "{label} must be a Boolean.", |v| {
        matches!(v, Value::Bool(_))
    })
}

pub fn integer() -> Filter {
    guard("integer", "{label} must be an Integer Number.", is_integer)
}

pub fn number() -> Filter {
    guard("number", "{label} must be a Number.", |v| v.as_f64().is_some())
}

pub fn object() -> Filter {
    guard("object", "{label} must be a Map.", |v| {
        matches!(v, Value::Object(_))
    })
}

pub fn string() -> Filter {
    guard("string", "{label} must be a String.", |v| {
        matches!(v, Value::String(_))
    })
}

pub fn reference() -> Filter {
    guard(
        "reference",
        "{label} must be an instance of DocumentReference.",
        |v| matches!(v, Value::Reference(_)),
    )
}

pub fn geopoint() -> Filter {
    guard("geopoint", "{label} must be an instance of GeoPoint.", |v| {
        matches!(v, Value::GeoPoint(_))
    })
}

pub fn timestamp() -> Filter {
    guard(
        "timestamp",
        "{label} must be an instance of Timestamp.",
        |v| matches!(v, Value::Timestamp(_)),
    )
}

fn is_any(value: &Value) -> bool {
    match value {
        Value::Undefined => false,
        Value::Float(f) => !f.is_nan(),
        _ => true,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Integer(_) => true,
        Value::Float(f) => f.is_finite() && f.fract() == 0.0,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

pub fn equal(compare: impl Into<Value>) -> Filter {
    let compare = compare.into();
    let message = format!("{{label}} must equal {}.", compare);
    guard("equal", message, move |v| scalar_eq(v, &compare))
}

/// Accepts only the listed scalar literals.
///
/// Fails at construction when the list is empty or holds non-scalars.
pub fn one_of(acceptable: Vec<Value>) -> StructureResult<Filter> {
    if acceptable.is_empty() {
        return Err(StructureError::new(
            "one_of(): acceptable values must be a list with at least one item.",
        ));
    }

    if !acceptable.iter().all(Value::is_scalar) {
        return Err(StructureError::new(
            "one_of(): each acceptable value must be a Boolean, Number or String.",
        ));
    }

    let listed: Vec<String> = acceptable.iter().map(|v| v.to_string()).collect();
    let message = format!(
        "{{label}} must be one of the accepted values ({}).",
        listed.join(", ")
    );

    Ok(guard("one_of", message, move |v| {
        acceptable.iter().any(|candidate| scalar_eq(v, candidate))
    }))
}

pub fn min(bound: f64) -> Filter {
    guard(
        "min",
        format!("{{label}} must be a Number greater than or equal to {}.", bound),
        move |v| v.as_f64().is_some_and(|n| bound <= n),
    )
}

pub fn max(bound: f64) -> Filter {
    guard(
        "max",
        format!("{{label}} must be a Number less than or equal to {}.", bound),
        move |v| v.as_f64().is_some_and(|n| n <= bound),
    )
}

pub fn range(lower: f64, upper: f64) -> Filter {
    guard(
        "range",
        format!("{{label}} must be a Number between {} and {}.", lower, upper),
        move |v| v.as_f64().is_some_and(|n| lower <= n && n <= upper),
    )
}

pub fn after(bound: DateTime<Utc>) -> Filter {
    guard(
        "after",
        format!("{{label}} must be after {}.", bound.to_rfc3339()),
        move |v| to_datetime(v).is_some_and(|t| t > bound),
    )
}

pub fn before(bound: DateTime<Utc>) -> Filter {
    guard(
        "before",
        format!("{{label}} must be before {}.", bound.to_rfc3339()),
        move |v| to_datetime(v).is_some_and(|t| t < bound),
    )
}

/// Numbers compare by value regardless of integer/float representation.
fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

pub fn length(expected: usize) -> Filter {
    guard(
        "length",
        format!("{{label}} must have length of {}.", expected),
        move |v| v.len() == Some(expected),
    )
}

pub fn min_length(bound: usize) -> Filter {
    guard(
        "min_length",
        format!("{{label}} must have length of at least {}.", bound),
        move |v| v.len().is_some_and(|n| bound <= n),
    )
}

pub fn max_length(bound: usize) -> Filter {
    guard(
        "max_length",
        format!("{{label}} must have length of at most {}.", bound),
        move |v| v.len().is_some_and(|n| n <= bound),
    )
}

/// Strings matching `pattern`.
pub fn matches(pattern: Regex) -> Filter {
    let message = format!("{{label}} must match {} pattern.", pattern.as_str());
    guard("matches", message, move |v| {
        v.as_str().is_some_and(|s| pattern.is_match(s))
    })
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

pub fn trim() -> Filter {
    string_transform("trim", "Couldn't trim {label}.", |s| s.trim().to_string())
}

pub fn to_lower_case() -> Filter {
    string_transform(
        "to_lower_case",
        "Couldn't turn {label} to lower case.",
        str::to_lowercase,
    )
}

pub fn to_upper_case() -> Filter {
    string_transform(
        "to_upper_case",
        "Couldn't turn {label} to upper case.",
        str::to_uppercase,
    )
}

/// Validates an email address, then lower-cases it.
pub fn email() -> Filter {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let pattern = EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("valid regex"));

    Filter::new("email", move |value| match value {
        Value::String(s) if pattern.is_match(&s) => Ok(Value::String(s.to_lowercase())),
        _ => Err(ValidationError::new("{label} must be a valid email.")),
    })
}

/// Validates a date string.
///
/// With a format, the parsed value must format back to the exact input so
/// that lenient parsing cannot accept malformed dates. Formats are chrono
/// strftime strings or moment-style tokens (`YYYY-MM-DD`).
pub fn date(format: Option<&str>) -> Filter {
    let message = match format {
        Some(f) => format!("{{label}} must be a valid Date in {} format.", f),
        None => "{label} must be a valid Date.".to_string(),
    };
    let strftime = format.map(to_strftime);

    guard("date", message, move |v| match (&strftime, v) {
        (Some(fmt), Value::String(s)) => parses_exactly(s, fmt),
        (Some(_), _) => false,
        (None, v) => to_datetime(v).is_some(),
    })
}

/// Translates moment-style tokens to strftime; `%` formats pass through.
pub fn to_strftime(format: &str) -> String {
    if format.contains('%') {
        return format.to_string();
    }

    const TOKENS: [(&str, &str); 8] = [
        ("YYYY", "%Y"),
        ("SSS", "%3f"),
        ("YY", "%y"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
    ];

    let mut out = String::with_capacity(format.len() + 8);
    let mut rest = format;
    'scan: while !rest.is_empty() {
        for (token, replacement) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

fn parses_exactly(input: &str, fmt: &str) -> bool {
    if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
        return dt.format(fmt).to_string() == input;
    }
    if let Ok(d) = NaiveDate::parse_from_str(input, fmt) {
        return d.format(fmt).to_string() == input;
    }
    if let Ok(t) = NaiveTime::parse_from_str(input, fmt) {
        return t.format(fmt).to_string() == input;
    }
    false
}

/// Interprets timestamps and common date strings as instants (UTC).
pub(crate) fn to_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Timestamp(t) => Some(*t),
        Value::String(s) => {
            if let Ok(t) = DateTime::parse_from_rfc3339(s) {
                return Some(t.with_timezone(&Utc));
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                return Some(dt.and_utc());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        }
        _ => None,
    }
}
