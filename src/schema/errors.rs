//! Schema error types
//!
//! Error codes:
//! - DOC_STRUCTURE_INVALID (FATAL): schema authoring defect
//! - DOC_VALIDATION_FAILED (REJECT): input data defect
//! - DOC_HOOK_FAILED (REJECT): lifecycle hook aborted the pass
//! - DOC_STORE_FAILED (REJECT): persistence collaborator failed

use std::fmt;

use thiserror::Error;

/// Placeholder substituted with the field label in validation messages
pub const LABEL_PLACEHOLDER: &str = "{label}";

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Input rejected, the caller may retry with other data
    Reject,
    /// Schema setup must abort
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema authoring defect, detected independently of any input value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StructureError {
    message: String,
}

impl StructureError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn missing_label() -> Self {
        Self::new("Field label must be defined.")
    }

    pub fn type_already_defined(label: &str) -> Self {
        Self::new(format!("Field '{}': type has already been defined.", label))
    }

    pub fn not_a_document(type_name: &str) -> Self {
        Self::new(format!("Document must be an object, got {}.", type_name))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Input data defect.
///
/// The message is a template until the nearest enclosing Field fills in
/// its label; after that `label()` reports which field rejected the value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
    label: Option<String>,
}

impl ValidationError {
    /// Creates an error from a message template
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            message: template.into(),
            label: None,
        }
    }

    /// Required-field error, already bound to its label
    pub fn required(label: &str) -> Self {
        Self {
            message: format!("{} is required.", label),
            label: Some(label.to_string()),
        }
    }

    /// Substitutes the label into the template.
    ///
    /// Only the first binding counts: an error raised by a nested field keeps
    /// the nested label when it propagates through its parents.
    pub fn with_label(mut self, label: &str) -> Self {
        if self.label.is_none() {
            self.message = self.message.replace(LABEL_PLACEHOLDER, label);
            self.label = Some(label.to_string());
        }
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Label of the field that rejected the value, once bound
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Umbrella error for schema, hook and model operations
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("[FATAL] DOC_STRUCTURE_INVALID: {0}")]
    Structure(#[from] StructureError),

    #[error("[REJECT] DOC_VALIDATION_FAILED: {0}")]
    Validation(#[from] ValidationError),

    #[error("[REJECT] DOC_HOOK_FAILED: hook on '{field}' failed: {message}")]
    Hook { field: String, message: String },

    #[error("[REJECT] DOC_STORE_FAILED: {0}")]
    Store(String),
}

impl SchemaError {
    pub fn hook(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Structure(_) => "DOC_STRUCTURE_INVALID",
            Self::Validation(_) => "DOC_VALIDATION_FAILED",
            Self::Hook { .. } => "DOC_HOOK_FAILED",
            Self::Store(_) => "DOC_STORE_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            Self::Structure(_) => Severity::Fatal,
            _ => Severity::Reject,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Returns the validation error, if this is one
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for schema construction
pub type StructureResult<T> = Result<T, StructureError>;

/// Result type for filters and field validation
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for schema, hook and model operations
pub type SchemaResult<T> = Result<T, SchemaError>;
