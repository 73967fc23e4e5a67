//! Persistence collaborator
//!
//! Models hand validated documents to a [`DocumentStore`]. The store only
//! persists; it never validates.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::schema::{SchemaError, SchemaResult};
use crate::value::Document;

/// Boxed future returned by store operations
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = SchemaResult<T>> + Send + 'a>>;

/// Document persistence keyed by collection path and document id.
pub trait DocumentStore: Send + Sync + fmt::Debug {
    /// Reads a document; `None` if it does not exist
    fn fetch<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, Option<Document>>;

    /// Stores a new document and returns its generated id
    fn create<'a>(&'a self, collection: &'a str, data: Document) -> StoreFuture<'a, String>;

    /// Replaces an existing document
    fn update<'a>(&'a self, collection: &'a str, id: &'a str, data: Document)
        -> StoreFuture<'a, ()>;

    /// Deletes an existing document
    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, ()>;
}

/// In-memory store for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Stores a document under a chosen id, replacing any existing one
    pub async fn insert(&self, collection: &str, id: &str, data: Document) {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
    }
}

fn not_found(collection: &str, id: &str) -> SchemaError {
    SchemaError::store(format!("Document '{}/{}' not found", collection, id))
}

impl DocumentStore for MemoryStore {
    fn fetch<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, Option<Document>> {
        Box::pin(async move {
            let collections = self.collections.read().await;
            Ok(collections
                .get(collection)
                .and_then(|docs| docs.get(id))
                .cloned())
        })
    }

    fn create<'a>(&'a self, collection: &'a str, data: Document) -> StoreFuture<'a, String> {
        Box::pin(async move {
            let id = Uuid::new_v4().to_string();
            self.insert(collection, &id, data).await;
            Ok(id)
        })
    }

    fn update<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        data: Document,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut collections = self.collections.write().await;
            let slot = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| not_found(collection, id))?;
            *slot = data;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut collections = self.collections.write().await;
            collections
                .get_mut(collection)
                .and_then(|docs| docs.remove(id))
                .map(|_| ())
                .ok_or_else(|| not_found(collection, id))
        })
    }
}
