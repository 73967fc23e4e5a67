//! Schema subsystem for docshape
//!
//! A [`Schema`] aggregates named [`Field`]s. Each Field runs an ordered
//! pipeline of filters and may recurse into nested object or array fields.
//!
//! # Design Principles
//!
//! - Fields and Schemas are read-only after construction and shareable
//! - Filters within one Field run strictly in sequence
//! - Nested keys and elements may be validated concurrently
//! - The first failure aborts the pass; errors are not aggregated
//! - Authoring defects (`StructureError`) are distinct from input defects
//!   (`ValidationError`)

mod changes;
mod errors;
mod field;
pub mod filters;
mod hooks;
mod loader;
mod registry;
mod types;
mod validator;

pub use changes::{mark_changed, ChangedPaths};
pub use errors::{
    SchemaError, SchemaResult, Severity, StructureError, StructureResult, ValidationError,
    ValidationResult, LABEL_PLACEHOLDER,
};
pub use field::{field, AsyncFilterFn, DefaultValue, Field, Outcome};
pub use filters::{Filter, FilterFn};
pub use hooks::{HookFn, Hooks, ModelContext};
pub use loader::SchemaLoader;
pub use registry::{FilterBuilder, FilterRegistry};
pub use types::{FieldKind, FieldSpec, FilterSpec, SchemaDef};
pub use validator::{schema, Schema};
