use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::{DocumentStore, MarkerRecord, Scope, StagedChanges};
use crate::errors::{MigrationError, Result};

/// Default separator, matching the `collection/id` convention of document databases.
const DEFAULT_SEPARATOR: char = '/';

type Documents = Arc<Mutex<BTreeMap<String, Value>>>;

/// Process-local document store.
///
/// Cloning shares the same underlying documents.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    documents: Documents,
    separator: char,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(Mutex::new(BTreeMap::new())),
            separator: DEFAULT_SEPARATOR,
        }
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Committed document under `id`.
    pub fn get(&self, id: &str) -> Option<Value> {
        lock(&self.documents).ok()?.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Committed ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        lock(&self.documents)
            .map(|documents| documents.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every committed document whose id starts with `prefix`.
    pub fn ids_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.ids().into_iter().filter(|id| id.starts_with(prefix)).collect()
    }

    /// Committed marker records, sorted by version.
    pub fn markers(&self) -> Vec<MarkerRecord> {
        let prefix = format!("{}{}", crate::migration::MARKER_COLLECTION, self.separator);
        let mut markers: Vec<MarkerRecord> = self
            .ids_with_prefix(&prefix)
            .into_iter()
            .filter_map(|id| self.get(&id))
            .filter_map(|doc| serde_json::from_value(doc).ok())
            .collect();
        markers.sort_by_key(|marker| marker.version);
        markers
    }
}

fn lock(documents: &Documents) -> Result<MutexGuard<'_, BTreeMap<String, Value>>> {
    documents
        .lock()
        .map_err(|_| MigrationError::other("in-memory store lock poisoned"))
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn identity_separator(&self) -> char {
        self.separator
    }

    async fn open_scope(&self) -> Result<Box<dyn Scope>> {
        Ok(Box::new(InMemoryScope {
            documents: Arc::clone(&self.documents),
            staged: StagedChanges::default(),
        }))
    }
}

struct InMemoryScope {
    documents: Documents,
    staged: StagedChanges,
}

#[async_trait]
impl Scope for InMemoryScope {
    async fn load(&mut self, id: &str) -> Result<Option<Value>> {
        if let Some(staged) = self.staged.get(id) {
            return Ok(staged.cloned());
        }
        Ok(lock(&self.documents)?.get(id).cloned())
    }

    fn store(&mut self, id: &str, document: Value) {
        self.staged.put(id, document);
    }

    fn delete(&mut self, id: &str) {
        self.staged.remove(id);
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryScope { documents, staged } = *self;
        log::trace!("committing {} staged change(s) to in-memory store", staged.len());

        let mut documents = lock(&documents)?;
        for (id, change) in staged.into_changes() {
            match change {
                Some(document) => {
                    documents.insert(id, document);
                }
                None => {
                    documents.remove(&id);
                }
            }
        }
        Ok(())
    }
}
