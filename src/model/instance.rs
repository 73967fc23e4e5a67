//! Live model instances
//!
//! All writes go through [`Model::set`], [`Model::set_path`] and
//! [`Model::remove`], which record changed paths for declared fields.
//! [`Model::validate`] runs pre hooks, selective validation and post hooks
//! over the recorded paths, then clears them.

use std::sync::Arc;

use super::definition::ModelDefinition;
use super::store::DocumentStore;
use crate::observability::{Event, ObservationScope};
use crate::schema::{mark_changed, ChangedPaths, ModelContext, SchemaError, SchemaResult};
use crate::value::{self, document_to_json, Document, Value};

/// One document bound to a model definition.
#[derive(Debug, Clone)]
pub struct Model {
    definition: Arc<ModelDefinition>,
    id: Option<String>,
    data: Document,
    changed: ChangedPaths,
}

impl Model {
    /// New, unsaved document. Every supplied declared field counts as changed.
    pub fn new(definition: Arc<ModelDefinition>, data: Document) -> Self {
        let mut changed = ChangedPaths::new();
        for (key, value) in &data {
            if definition.schema().contains(key) {
                mark_changed(&mut changed, value, &[key.as_str()]);
            }
        }

        Self {
            definition,
            id: None,
            data,
            changed,
        }
    }

    /// Document read from a store; nothing is changed.
    pub fn from_snapshot(
        definition: Arc<ModelDefinition>,
        id: impl Into<String>,
        data: Document,
    ) -> Self {
        Self {
            definition,
            id: Some(id.into()),
            data,
            changed: ChangedPaths::new(),
        }
    }

    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    /// Store id; `None` until created
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn data(&self) -> &Document {
        &self.data
    }

    pub fn changed_paths(&self) -> &ChangedPaths {
        &self.changed
    }

    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Reads a nested value (`"address.city"`, `"tags.0"`)
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        value::get_path(&self.data, path)
    }

    /// Replaces a top-level value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        self.track(&[key.as_str()], &value);
        self.data.insert(key, value);
    }

    /// Writes a nested value, creating intermediate objects as needed.
    /// Returns false, recording nothing, when the path cannot be written
    /// (see [`value::can_set_path`]).
    pub fn set_path(&mut self, path: &str, value: impl Into<Value>) -> bool {
        if !value::can_set_path(&self.data, path) {
            return false;
        }
        let value = value.into();
        let segments = value::split_path(path);
        self.track(&segments, &value);
        value::set_path(&mut self.data, path, value)
    }

    /// Removes a top-level value; a removed declared field counts as changed
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.track(&[key], &Value::Undefined);
        }
        removed
    }

    fn track(&mut self, segments: &[&str], value: &Value) {
        let declared = segments
            .first()
            .is_some_and(|name| self.definition.schema().contains(name));
        if declared {
            mark_changed(&mut self.changed, value, segments);
        }
    }

    /// Snapshot handed to hooks
    pub fn context(&self) -> ModelContext {
        ModelContext::new(self.definition.name(), self.definition.collection_path())
            .with_id(self.id.clone())
            .with_changed(self.changed.clone())
    }

    /// Pre hooks, selective validation, post hooks.
    ///
    /// On success the data is replaced by the result and changes are cleared.
    /// On failure data and changes are left as they were.
    pub async fn validate(&mut self) -> SchemaResult<&Document> {
        let data = self.validated().await?;
        self.commit(data);
        Ok(&self.data)
    }

    /// Runs the validation pass without touching the instance.
    async fn validated(&self) -> SchemaResult<Document> {
        let ctx = self.context();
        let hooks = self.definition.hooks();

        let data = hooks.run_pre(self.data.clone(), &ctx).await?;
        let validated = self
            .definition
            .schema()
            .validate_selected(&data, &self.changed)
            .await?;
        hooks.run_post(validated, &ctx).await
    }

    fn commit(&mut self, data: Document) {
        self.data = data;
        self.changed.clear();
    }

    /// Loads a document by id; `None` if the store has no such document.
    pub async fn fetch(
        definition: Arc<ModelDefinition>,
        store: &dyn DocumentStore,
        id: &str,
    ) -> SchemaResult<Option<Model>> {
        let scope = ObservationScope::with_fields(
            Event::ModelFetch,
            vec![
                ("model", definition.name().to_string()),
                ("id", id.to_string()),
            ],
        );

        match store.fetch(definition.collection_path(), id).await {
            Ok(found) => {
                scope.complete();
                Ok(found.map(|data| Model::from_snapshot(definition, id, data)))
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    /// Validates and stores a new document. Returns the generated id.
    ///
    /// The instance is only updated once the store accepts the document.
    pub async fn create(&mut self, store: &dyn DocumentStore) -> SchemaResult<String> {
        if let Some(id) = &self.id {
            return Err(SchemaError::store(format!(
                "{} '{}' has already been created",
                self.definition.name(),
                id
            )));
        }

        let scope = self.scope(Event::ModelCreate);
        let result = async {
            let data = self.validated().await?;
            let id = store
                .create(self.definition.collection_path(), data.clone())
                .await?;
            Ok::<_, SchemaError>((id, data))
        }
        .await;

        match result {
            Ok((id, data)) => {
                scope.complete();
                self.commit(data);
                self.id = Some(id.clone());
                Ok(id)
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    /// Validates and stores changes. Returns false when nothing changed.
    /// A failed write leaves the changes pending.
    pub async fn update(&mut self, store: &dyn DocumentStore) -> SchemaResult<bool> {
        let id = self.require_id("updated")?;
        if !self.is_changed() {
            return Ok(false);
        }

        let scope = self.scope(Event::ModelUpdate);
        let result = async {
            let data = self.validated().await?;
            store
                .update(self.definition.collection_path(), &id, data.clone())
                .await?;
            Ok::<_, SchemaError>(data)
        }
        .await;

        match result {
            Ok(data) => {
                scope.complete();
                self.commit(data);
                Ok(true)
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    /// Deletes the stored document. The instance keeps its data but loses its id.
    pub async fn delete(&mut self, store: &dyn DocumentStore) -> SchemaResult<()> {
        let id = self.require_id("deleted")?;

        let scope = self.scope(Event::ModelDelete);
        match store.delete(self.definition.collection_path(), &id).await {
            Ok(()) => {
                scope.complete();
                self.id = None;
                Ok(())
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    fn require_id(&self, action: &str) -> SchemaResult<String> {
        self.id.clone().ok_or_else(|| {
            SchemaError::store(format!(
                "{} must be created before it can be {}",
                self.definition.name(),
                action
            ))
        })
    }

    fn scope(&self, event: Event) -> ObservationScope {
        ObservationScope::with_fields(
            event,
            vec![
                ("model", self.definition.name().to_string()),
                ("id", self.id.clone().unwrap_or_default()),
            ],
        )
    }

    /// Current data as JSON
    pub fn to_json(&self) -> serde_json::Value {
        document_to_json(&self.data)
    }
}
