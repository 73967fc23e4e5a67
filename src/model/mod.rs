//! Model layer for docshape
//!
//! Binds a schema and hooks to a collection, tracks writes to live
//! documents, and hands validated documents to a persistence collaborator.
//!
//! Lifecycle of one write:
//! 1. `set` / `set_path` / `remove` record changed paths
//! 2. pre hooks run for every changed top-level field
//! 3. changed top-level fields are re-validated
//! 4. post hooks run on the validated document
//! 5. the store receives the result and the changes are cleared

mod definition;
mod instance;
mod store;

pub use definition::ModelDefinition;
pub use instance::Model;
pub use store::{DocumentStore, MemoryStore, StoreFuture};
