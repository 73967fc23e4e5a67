//! Field: the validation contract for one value
//!
//! A Field is built once with a fluent builder and then used read-only,
//! from any number of concurrent validations.
//!
//! Evaluation order of `validate`, each step short-circuiting the rest:
//! 1. Absent input takes the default (producers run on every call)
//! 2. Optional and still absent: `Outcome::Absent`
//! 3. Nullable and null or absent: `Outcome::Null`
//! 4. Null or absent: required-field error
//! 5. Pipeline stages, in registration order
//! 6. `object_of`: nested fields, absent keys dropped
//! 7. `array_of`: element field, absent elements dropped

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::{try_join_all, BoxFuture};
use regex::Regex;

use super::errors::{StructureError, StructureResult, ValidationError, ValidationResult};
use super::filters::{self, Filter};
use crate::config;
use crate::value::{Document, Value};

/// Signature of an asynchronous pipeline stage
pub type AsyncFilterFn = dyn Fn(Value) -> BoxFuture<'static, ValidationResult<Value>> + Send + Sync;

/// Result of validating one value.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Optional field with no value: the key is omitted from containers
    Absent,
    /// Explicit null accepted by a nullable field
    Null,
    /// Value that passed the full pipeline
    Present(Value),
}

impl Outcome {
    /// Converts to a value; `Absent` becomes `None`.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Outcome::Absent => None,
            Outcome::Null => Some(Value::Null),
            Outcome::Present(v) => Some(v),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Outcome::Absent)
    }
}

/// Default used when the input is absent
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    fn produce(&self) -> Value {
        match self {
            DefaultValue::Literal(v) => v.clone(),
            DefaultValue::Producer(f) => f(),
        }
    }
}

#[derive(Clone)]
enum Stage {
    Sync(Filter),
    Async {
        name: String,
        func: Arc<AsyncFilterFn>,
    },
}

impl Stage {
    fn with_message(self, template: String) -> Self {
        match self {
            Stage::Sync(filter) => Stage::Sync(filter.with_message(template)),
            Stage::Async { name, func } => {
                let wrapped: Arc<AsyncFilterFn> =
                    Arc::new(move |value| -> BoxFuture<'static, ValidationResult<Value>> {
                        let template = template.clone();
                        let inner = func(value);
                        Box::pin(async move {
                            inner.await.map_err(|_| ValidationError::new(template))
                        })
                    });
                Stage::Async {
                    name,
                    func: wrapped,
                }
            }
        }
    }

    fn name(&self) -> &str {
        match self {
            Stage::Sync(filter) => filter.name(),
            Stage::Async { name, .. } => name,
        }
    }

    async fn run(&self, value: Value) -> ValidationResult<Value> {
        match self {
            Stage::Sync(filter) => filter.apply(value),
            Stage::Async { func, .. } => func(value).await,
        }
    }
}

/// Generates infallible builder methods that append a catalogue filter.
macro_rules! filter_methods {
    ($( $(#[$meta:meta])* $name:ident ( $($arg:ident : $ty:ty),* ); )*) => {
        $(
            $(#[$meta])*
            pub fn $name(self, $($arg: $ty),*) -> Self {
                self.filter(filters::$name($($arg),*))
            }
        )*
    };
}

/// Generates type-defining builder methods; a Field has exactly one type.
macro_rules! type_methods {
    ($( $(#[$meta:meta])* $name:ident ( $($arg:ident : $ty:ty),* ); )*) => {
        $(
            $(#[$meta])*
            pub fn $name(self, $($arg: $ty),*) -> StructureResult<Self> {
                Ok(self.define_type()?.filter(filters::$name($($arg),*)))
            }
        )*
    };
}

/// Validation contract for one named value.
#[derive(Clone)]
pub struct Field {
    label: String,
    type_defined: bool,
    nullable: bool,
    optional: bool,
    default: Option<DefaultValue>,
    stages: Vec<Stage>,
    object_of: Option<Arc<BTreeMap<String, Field>>>,
    array_of: Option<Arc<Field>>,
}

/// Creates a Field. The label must be non-empty.
pub fn field(label: impl Into<String>) -> StructureResult<Field> {
    Field::new(label)
}

impl Field {
    pub fn new(label: impl Into<String>) -> StructureResult<Self> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(StructureError::missing_label());
        }

        Ok(Self {
            label,
            type_defined: false,
            nullable: false,
            optional: false,
            default: None,
            stages: Vec::new(),
            object_of: None,
            array_of: None,
        })
    }

    fn define_type(mut self) -> StructureResult<Self> {
        if self.type_defined {
            return Err(StructureError::type_already_defined(&self.label));
        }
        self.type_defined = true;
        Ok(self)
    }

    type_methods! {
        any();
        array();
        boolean();
        integer();
        number();
        object();
        string();
        reference();
        geopoint();
        timestamp();
        /// Date string, optionally in an exact format
        date(format: Option<&str>);
    }

    filter_methods! {
        equal(compare: Value);
        min(bound: f64);
        max(bound: f64);
        range(lower: f64, upper: f64);
        after(bound: DateTime<Utc>);
        before(bound: DateTime<Utc>);
        length(expected: usize);
        min_length(bound: usize);
        max_length(bound: usize);
        /// Strings matching the pattern
        matches(pattern: Regex);
        trim();
        to_lower_case();
        to_upper_case();
        /// Validates, then lower-cases
        email();
    }

    /// Restricts the value to a list of scalar literals (type-defining).
    ///
    /// Fails when the list is empty or contains non-scalars.
    pub fn one_of(self, values: Vec<Value>) -> StructureResult<Self> {
        let filter = filters::one_of(values)?;
        Ok(self.define_type()?.filter(filter))
    }

    /// Declares an object whose keys are validated by nested fields.
    pub fn object_of<I, K>(self, fields: I) -> StructureResult<Self>
    where
        I: IntoIterator<Item = (K, Field)>,
        K: Into<String>,
    {
        let mut this = self.define_type()?;
        this.object_of = Some(Arc::new(
            fields.into_iter().map(|(k, f)| (k.into(), f)).collect(),
        ));
        Ok(this.filter(filters::object()))
    }

    /// Declares an array whose elements are validated by `item`.
    pub fn array_of(self, item: Field) -> StructureResult<Self> {
        let mut this = self.define_type()?;
        this.array_of = Some(Arc::new(item));
        Ok(this.filter(filters::array()))
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Literal default used when the input is absent (never on null)
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Default produced on every call where the input is absent
    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Producer(Arc::new(producer)));
        self
    }

    /// Appends a filter to the pipeline
    pub fn filter(mut self, filter: Filter) -> Self {
        self.stages.push(Stage::Sync(filter));
        self
    }

    /// Appends a custom transform/validator at this point of the pipeline
    pub fn custom<F>(self, func: F) -> Self
    where
        F: Fn(Value) -> ValidationResult<Value> + Send + Sync + 'static,
    {
        self.filter(Filter::new("custom", func))
    }

    /// Appends an asynchronous custom stage at this point of the pipeline
    pub fn custom_async<F, Fut>(mut self, stage: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ValidationResult<Value>> + Send + 'static,
    {
        let func: Arc<AsyncFilterFn> =
            Arc::new(move |value| -> BoxFuture<'static, ValidationResult<Value>> {
                Box::pin(stage(value))
            });
        self.stages.push(Stage::Async {
            name: "custom_async".to_string(),
            func,
        });
        self
    }

    /// Replaces the error template of the most recently added stage,
    /// synchronous or asynchronous
    pub fn message(mut self, template: impl Into<String>) -> Self {
        if let Some(last) = self.stages.pop() {
            self.stages.push(last.with_message(template.into()));
        }
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_type_defined(&self) -> bool {
        self.type_defined
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Names of the pipeline stages, in order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    pub fn object_fields(&self) -> Option<&BTreeMap<String, Field>> {
        self.object_of.as_deref()
    }

    pub fn array_item(&self) -> Option<&Field> {
        self.array_of.as_deref()
    }

    /// Validates a value; `None` (or `Value::Undefined`) means absent.
    pub fn validate(&self, input: Option<Value>) -> BoxFuture<'_, ValidationResult<Outcome>> {
        Box::pin(async move {
            let input = input
                .filter(|v| !v.is_undefined())
                .or_else(|| self.default.as_ref().map(DefaultValue::produce))
                .filter(|v| !v.is_undefined());

            if self.optional && input.is_none() {
                return Ok(Outcome::Absent);
            }

            let value = match input {
                None | Some(Value::Null) if self.nullable => return Ok(Outcome::Null),
                None | Some(Value::Null) => return Err(ValidationError::required(&self.label)),
                Some(v) => v,
            };

            let mut value = self.run_pipeline(value).await?;

            if let Some(fields) = &self.object_of {
                value = self.validate_object(fields, value).await?;
            }

            if let Some(item) = &self.array_of {
                value = self.validate_array(item, value).await?;
            }

            Ok(Outcome::Present(value))
        })
    }

    async fn run_pipeline(&self, mut value: Value) -> ValidationResult<Value> {
        for stage in &self.stages {
            value = stage
                .run(value)
                .await
                .map_err(|e| e.with_label(&self.label))?;
        }
        Ok(value)
    }

    async fn validate_object(
        &self,
        fields: &BTreeMap<String, Field>,
        value: Value,
    ) -> ValidationResult<Value> {
        let Value::Object(mut input) = value else {
            return Err(ValidationError::new("{label} must be a Map.").with_label(&self.label));
        };

        let validated = validate_entries(fields, &mut input).await?;
        Ok(Value::Object(validated))
    }

    async fn validate_array(&self, item: &Field, value: Value) -> ValidationResult<Value> {
        let Value::Array(items) = value else {
            return Err(ValidationError::new("{label} must be an Array.").with_label(&self.label));
        };

        let outcomes = if config::concurrent_nested() {
            try_join_all(items.into_iter().map(|v| item.validate(Some(v)))).await?
        } else {
            let mut outcomes = Vec::with_capacity(items.len());
            for v in items {
                outcomes.push(item.validate(Some(v)).await?);
            }
            outcomes
        };

        Ok(Value::Array(
            outcomes.into_iter().filter_map(Outcome::into_value).collect(),
        ))
    }
}

/// Validates each declared field against the matching key of `input`,
/// removing consumed keys. Absent outcomes are omitted from the result.
pub(crate) async fn validate_entries<'a, I>(
    fields: I,
    input: &mut Document,
) -> ValidationResult<Document>
where
    I: IntoIterator<Item = (&'a String, &'a Field)>,
{
    let jobs: Vec<(&String, &Field, Option<Value>)> = fields
        .into_iter()
        .map(|(key, field)| (key, field, input.remove(key)))
        .collect();

    let outcomes = if config::concurrent_nested() {
        try_join_all(jobs.into_iter().map(|(key, field, value)| async move {
            field.validate(value).await.map(|o| (key, o))
        }))
        .await?
    } else {
        let mut outcomes = Vec::with_capacity(jobs.len());
        for (key, field, value) in jobs {
            outcomes.push((key, field.validate(value).await?));
        }
        outcomes
    };

    Ok(outcomes
        .into_iter()
        .filter_map(|(key, outcome)| outcome.into_value().map(|v| (key.clone(), v)))
        .collect())
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("label", &self.label)
            .field("nullable", &self.nullable)
            .field("optional", &self.optional)
            .field("has_default", &self.default.is_some())
            .field("stages", &self.stage_names())
            .field("object_of", &self.object_of)
            .field("array_of", &self.array_of)
            .finish()
    }
}
