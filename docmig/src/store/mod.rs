//! Document store abstraction used by the runner and by migration bodies.
//!
//! A [`Scope`] stages writes and makes them durable together on
//! [`Scope::commit`]. Dropping a scope without committing discards everything it
//! staged, which is how a failed migration is rolled back.

mod memory;
mod redis_store;

pub use memory::InMemoryStore;
pub use redis_store::{DEFAULT_KEY_PREFIX, RedisStore};

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;

/// A document-oriented store that can open transactional scopes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Separator placed between the parts of a document id (`/`, `:`, ...).
    fn identity_separator(&self) -> char;

    async fn open_scope(&self) -> Result<Box<dyn Scope>>;
}

/// Unit of work against a [`DocumentStore`].
///
/// Reads observe the scope's own staged writes.
#[async_trait]
pub trait Scope: Send {
    async fn load(&mut self, id: &str) -> Result<Option<Value>>;

    fn store(&mut self, id: &str, document: Value);

    fn delete(&mut self, id: &str);

    /// Apply every staged write atomically.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Persisted evidence that a migration's `up` ran and has not been reverted.
///
/// Only the id is required. Markers written by older tools carry nothing else,
/// so the remaining fields fall back to their defaults when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub execution_time_ms: u64,
}

impl MarkerRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version,
            applied_at: Some(Utc::now()),
            execution_time_ms: 0,
        }
    }

    pub fn with_execution_time(mut self, execution_time_ms: u64) -> Self {
        self.execution_time_ms = execution_time_ms;
        self
    }

    /// Whether a marker document exists under `id`, whatever its shape.
    pub async fn exists(scope: &mut dyn Scope, id: &str) -> Result<bool> {
        Ok(scope.load(id).await?.is_some())
    }

    /// Load the marker stored under `id`, if any.
    pub async fn load(scope: &mut dyn Scope, id: &str) -> Result<Option<Self>> {
        match scope.load(id).await? {
            Some(document) => Ok(Some(serde_json::from_value(document)?)),
            None => Ok(None),
        }
    }

    /// Stage this marker for creation in `scope`.
    pub fn stage(&self, scope: &mut dyn Scope) -> Result<()> {
        let document = serde_json::to_value(self)?;
        scope.store(&self.id, document);
        Ok(())
    }

    /// Stage deletion of the marker under `id`. Deleting an absent marker is a no-op.
    pub fn stage_delete(scope: &mut dyn Scope, id: &str) {
        scope.delete(id);
    }
}

/// Pending writes of a scope, keyed by id. `None` means delete.
#[derive(Debug, Clone, Default)]
pub(crate) struct StagedChanges {
    changes: BTreeMap<String, Option<Value>>,
}

impl StagedChanges {
    /// `Some(..)` when the id has a staged write, holding the staged value.
    pub(crate) fn get(&self, id: &str) -> Option<Option<&Value>> {
        self.changes.get(id).map(Option::as_ref)
    }

    pub(crate) fn put(&mut self, id: &str, document: Value) {
        self.changes.insert(id.to_string(), Some(document));
    }

    pub(crate) fn remove(&mut self, id: &str) {
        self.changes.insert(id.to_string(), None);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.changes.len()
    }

    pub(crate) fn into_changes(self) -> impl Iterator<Item = (String, Option<Value>)> {
        self.changes.into_iter()
    }
}
