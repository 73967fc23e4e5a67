//! Hook pipeline
//!
//! Two tables, pre and post validation, keyed by top-level field name.
//! Callbacks registered under one name accumulate in registration order.
//!
//! During a pass, every top-level name in the current changed-paths set
//! (sorted) has its callbacks run strictly in sequence, each receiving the
//! previous callback's output. The first error aborts the pass.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::changes::ChangedPaths;
use super::errors::SchemaResult;
use crate::observability::{Event, Logger, ObservationScope};
use crate::value::Document;

/// Hook callback: transforms the in-flight document.
pub type HookFn = dyn for<'a> Fn(Document, &'a ModelContext) -> BoxFuture<'a, SchemaResult<Document>>
    + Send
    + Sync;

/// What a hook sees of the model that owns the pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelContext {
    name: String,
    collection_path: String,
    id: Option<String>,
    changed: ChangedPaths,
}

impl ModelContext {
    pub fn new(name: impl Into<String>, collection_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection_path: collection_path.into(),
            id: None,
            changed: ChangedPaths::new(),
        }
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    pub fn with_changed(mut self, changed: ChangedPaths) -> Self {
        self.changed = changed;
        self
    }

    /// Model name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection_path(&self) -> &str {
        &self.collection_path
    }

    /// Document id; `None` before the first create
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn changed_paths(&self) -> &ChangedPaths {
        &self.changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pre,
    Post,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Phase::Pre => "pre",
            Phase::Post => "post",
        }
    }
}

/// Pre- and post-validation hook tables. Populated at definition time.
#[derive(Clone, Default)]
pub struct Hooks {
    pre: BTreeMap<String, Vec<Arc<HookFn>>>,
    post: BTreeMap<String, Vec<Arc<HookFn>>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback run before validation when `name` changed.
    pub fn prehook<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: for<'a> Fn(Document, &'a ModelContext) -> BoxFuture<'a, SchemaResult<Document>>
            + Send
            + Sync
            + 'static,
    {
        self.pre.entry(name.into()).or_default().push(Arc::new(hook));
        self
    }

    /// Registers a callback run after successful validation when `name` changed.
    pub fn posthook<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: for<'a> Fn(Document, &'a ModelContext) -> BoxFuture<'a, SchemaResult<Document>>
            + Send
            + Sync
            + 'static,
    {
        self.post.entry(name.into()).or_default().push(Arc::new(hook));
        self
    }

    /// Number of callbacks registered for `name` in the pre table
    pub fn pre_count(&self, name: &str) -> usize {
        self.pre.get(name).map_or(0, Vec::len)
    }

    pub fn post_count(&self, name: &str) -> usize {
        self.post.get(name).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.post.is_empty()
    }

    pub async fn run_pre(&self, data: Document, ctx: &ModelContext) -> SchemaResult<Document> {
        run_table(&self.pre, Phase::Pre, data, ctx).await
    }

    pub async fn run_post(&self, data: Document, ctx: &ModelContext) -> SchemaResult<Document> {
        run_table(&self.post, Phase::Post, data, ctx).await
    }
}

async fn run_table(
    table: &BTreeMap<String, Vec<Arc<HookFn>>>,
    phase: Phase,
    mut data: Document,
    ctx: &ModelContext,
) -> SchemaResult<Document> {
    for name in ctx.changed_paths().top_level() {
        let Some(callbacks) = table.get(&name) else {
            continue;
        };

        let scope = ObservationScope::with_fields(
            Event::HookRun,
            vec![
                ("phase", phase.as_str().to_string()),
                ("field", name.clone()),
                ("callbacks", callbacks.len().to_string()),
            ],
        );

        for callback in callbacks {
            data = match callback(data, ctx).await {
                Ok(next) => next,
                Err(e) => {
                    let reason = e.to_string();
                    Logger::warn(
                        Event::HookFailed.as_str(),
                        &[
                            ("phase", phase.as_str()),
                            ("field", name.as_str()),
                            ("reason", reason.as_str()),
                        ],
                    );
                    scope.fail(&reason);
                    return Err(e);
                }
            };
        }
        scope.complete();
    }
    Ok(data)
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = |table: &BTreeMap<String, Vec<Arc<HookFn>>>| {
            table
                .iter()
                .map(|(k, v)| (k.clone(), v.len()))
                .collect::<BTreeMap<_, _>>()
        };
        f.debug_struct("Hooks")
            .field("pre", &counts(&self.pre))
            .field("post", &counts(&self.post))
            .finish()
    }
}
