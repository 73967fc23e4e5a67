//! Model definitions: schema, collection and hooks bound under one name

use std::sync::Arc;

use crate::schema::{Hooks, Schema, StructureError, StructureResult};

/// Static description shared by every instance of a model.
#[derive(Debug, Clone)]
pub struct ModelDefinition {
    name: String,
    collection_path: String,
    schema: Arc<Schema>,
    hooks: Hooks,
}

impl ModelDefinition {
    /// Fails when the name or collection path is empty.
    pub fn new(
        name: impl Into<String>,
        collection_path: impl Into<String>,
        schema: Arc<Schema>,
    ) -> StructureResult<Self> {
        let name = name.into();
        let collection_path = collection_path.into();

        if name.trim().is_empty() {
            return Err(StructureError::new("Model name must be defined."));
        }
        if collection_path.trim().is_empty() {
            return Err(StructureError::new(format!(
                "{} must have a collection path.",
                name
            )));
        }

        Ok(Self {
            name,
            collection_path,
            schema,
            hooks: Hooks::new(),
        })
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection_path(&self) -> &str {
        &self.collection_path
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{field, schema};

    fn user_schema() -> Arc<Schema> {
        Arc::new(schema(vec![("name", field("name").unwrap().string().unwrap())]))
    }

    #[test]
    fn test_definition() {
        let def = ModelDefinition::new("User", "users", user_schema()).unwrap();
        assert_eq!(def.name(), "User");
        assert_eq!(def.collection_path(), "users");
        assert_eq!(def.schema().len(), 1);
        assert!(def.hooks().is_empty());
    }

    #[test]
    fn test_missing_collection_path() {
        let err = ModelDefinition::new("User", "  ", user_schema()).unwrap_err();
        assert_eq!(err.message(), "User must have a collection path.");
    }

    #[test]
    fn test_missing_name() {
        assert!(ModelDefinition::new("", "users", user_schema()).is_err());
    }
}
