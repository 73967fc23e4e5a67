//! docshape - schema-driven document validation with change-aware re-validation
//!
//! - `schema`: Fields, filters, Schemas, change tracking and hooks
//! - `model`: live documents, lifecycle orchestration and the store seam
//! - `value`: the document value model
//! - `config`: process-wide settings
//! - `observability`: structured logging

pub mod config;
pub mod model;
pub mod observability;
pub mod schema;
pub mod value;

pub use schema::{field, schema, Field, Schema};
pub use value::{Document, Value};
