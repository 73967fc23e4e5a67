//! Schema loader for declarative schema files
//!
//! - One JSON file per schema, named `<schema>.json`
//! - Schemas are keyed by file stem and cannot be replaced once registered
//! - Malformed files abort loading (FATAL)

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::errors::{StructureError, StructureResult};
use super::registry::FilterRegistry;
use super::types::SchemaDef;
use super::validator::Schema;
use crate::observability::{log_event_with_fields, Event};

/// Builds schemas from JSON definitions and keeps them by name.
#[derive(Debug, Default)]
pub struct SchemaLoader {
    registry: FilterRegistry,
    schemas: BTreeMap<String, Arc<Schema>>,
}

impl SchemaLoader {
    /// Loader using the catalogue filters
    pub fn new() -> Self {
        Self::with_registry(FilterRegistry::new())
    }

    /// Loader resolving filters through `registry`
    pub fn with_registry(registry: FilterRegistry) -> Self {
        Self {
            registry,
            schemas: BTreeMap::new(),
        }
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Parses and builds a schema without registering it.
    pub fn parse(&self, content: &str) -> StructureResult<Schema> {
        let def: SchemaDef = serde_json::from_str(content)
            .map_err(|e| StructureError::new(format!("Invalid schema JSON: {}", e)))?;
        def.build(&self.registry)
    }

    /// Parses a schema and registers it under `name`.
    pub fn register_json(&mut self, name: &str, content: &str) -> StructureResult<Arc<Schema>> {
        let schema = self.parse(content).inspect_err(|e| {
            log_event_with_fields(
                Event::SchemaInvalid,
                &[("name", name), ("reason", e.message())],
            );
        })?;
        self.register(name, schema)
    }

    /// Registers a schema built in code.
    pub fn register(&mut self, name: &str, schema: Schema) -> StructureResult<Arc<Schema>> {
        if name.is_empty() {
            return Err(StructureError::new("Schema name must not be empty."));
        }
        if self.schemas.contains_key(name) {
            return Err(StructureError::new(format!(
                "Schema '{}' is already registered.",
                name
            )));
        }

        let field_count = schema.len().to_string();
        let schema = Arc::new(schema);
        self.schemas.insert(name.to_string(), Arc::clone(&schema));

        log_event_with_fields(
            Event::SchemaLoaded,
            &[("name", name), ("fields", field_count.as_str())],
        );
        Ok(schema)
    }

    /// Loads one schema file, keyed by its file stem.
    pub fn load_file(&mut self, path: &Path) -> StructureResult<Arc<Schema>> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                StructureError::new(format!("Invalid schema file name '{}'.", path.display()))
            })?
            .to_string();

        let content = fs::read_to_string(path).map_err(|e| {
            StructureError::new(format!(
                "Failed to read schema file '{}': {}",
                path.display(),
                e
            ))
        })?;

        self.register_json(&name, &content).map_err(|e| {
            StructureError::new(format!("{}: {}", path.display(), e.message()))
        })
    }

    /// Loads every `*.json` file in `dir` in file name order. Returns the count.
    pub fn load_dir(&mut self, dir: &Path) -> StructureResult<usize> {
        let entries = fs::read_dir(dir).map_err(|e| {
            StructureError::new(format!(
                "Failed to read schema directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                StructureError::new(format!("Failed to read directory entry: {}", e))
            })?;
            let path = entry.path();

            // Skip non-JSON files
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            self.load_file(path)?;
        }
        Ok(paths.len())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Schema>> {
        self.schemas.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
