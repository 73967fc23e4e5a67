//! Observable events for validation and model lifecycle
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration applied
    ConfigLoaded,
    /// Declarative schema loaded
    SchemaLoaded,
    /// Declarative schema rejected (FATAL)
    SchemaInvalid,

    // Validation
    /// Whole-document validation pass
    SchemaValidate,
    /// Selective validation pass over changed fields
    SchemaValidateSelected,
    /// A field rejected its input
    FieldRejected,

    // Hooks
    /// Hook callbacks ran for a field
    HookRun,
    /// Hook callback aborted the pass
    HookFailed,

    // Model lifecycle
    /// Document fetched from the store
    ModelFetch,
    /// Document created in the store
    ModelCreate,
    /// Document updated in the store
    ModelUpdate,
    /// Document deleted from the store
    ModelDelete,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemaLoaded => "SCHEMA_LOADED",
            Event::SchemaInvalid => "SCHEMA_INVALID",

            Event::SchemaValidate => "SCHEMA_VALIDATE",
            Event::SchemaValidateSelected => "SCHEMA_VALIDATE_SELECTED",
            Event::FieldRejected => "FIELD_REJECTED",

            Event::HookRun => "HOOK_RUN",
            Event::HookFailed => "HOOK_FAILED",

            Event::ModelFetch => "MODEL_FETCH",
            Event::ModelCreate => "MODEL_CREATE",
            Event::ModelUpdate => "MODEL_UPDATE",
            Event::ModelDelete => "MODEL_DELETE",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::SchemaInvalid)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
