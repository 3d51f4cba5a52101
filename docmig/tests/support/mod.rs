#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docmig::{
    DocumentStore, InMemoryStore, ListSource, Migration, MigrationError, MigrationFactory, MigrationLogger,
    MigrationMetadata, Result, Scope,
};
use serde_json::{Value, json};

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn snapshot(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Document each recording migration writes in `up` and removes in `down`.
pub fn doc_id(name: &str) -> String {
    format!("docs/{name}")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fail {
    #[default]
    Never,
    Up,
    Down,
}

/// Records `Name:up` / `Name:down` into a shared log and touches one document.
#[derive(Clone)]
pub struct Recording {
    name: String,
    calls: CallLog,
    fail: Fail,
    setup_called: bool,
}

#[async_trait]
impl Migration for Recording {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, _store: Arc<dyn DocumentStore>, _logger: Arc<dyn MigrationLogger>) {
        self.setup_called = true;
    }

    async fn up(&mut self, scope: &mut dyn Scope) -> Result<()> {
        if !self.setup_called {
            return Err(MigrationError::other("up() ran before setup()"));
        }
        self.calls.lock().unwrap().push(format!("{}:up", self.name));
        scope.store(&doc_id(&self.name), json!({ "migrated_by": self.name }));
        if self.fail == Fail::Up {
            return Err(MigrationError::other("up exploded"));
        }
        Ok(())
    }

    async fn down(&mut self, scope: &mut dyn Scope) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{}:down", self.name));
        scope.delete(&doc_id(&self.name));
        if self.fail == Fail::Down {
            return Err(MigrationError::other("down exploded"));
        }
        Ok(())
    }
}

/// Builds a [`ListSource`] of recording migrations sharing one call log.
#[derive(Clone, Default)]
pub struct Fixture {
    pub calls: CallLog,
    pub built: CallLog,
    source_entries: Vec<(String, MigrationMetadata, Fail)>,
    unversioned: Vec<String>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(self, name: &str, version: i64, profiles: &[&str]) -> Self {
        self.add_with(name, version, profiles, Fail::Never)
    }

    pub fn add_with(mut self, name: &str, version: i64, profiles: &[&str], fail: Fail) -> Self {
        let metadata = MigrationMetadata::new(version).with_profiles(profiles.iter().copied());
        self.source_entries.push((name.to_string(), metadata, fail));
        self
    }

    /// A candidate that carries no version metadata.
    pub fn add_unversioned(mut self, name: &str) -> Self {
        self.unversioned.push(name.to_string());
        self
    }

    pub fn factory(&self, name: &str, fail: Fail) -> MigrationFactory {
        let name = name.to_string();
        let calls = Arc::clone(&self.calls);
        let built = Arc::clone(&self.built);
        Arc::new(move || {
            built.lock().unwrap().push(name.clone());
            Box::new(Recording {
                name: name.clone(),
                calls: Arc::clone(&calls),
                fail,
                setup_called: false,
            }) as Box<dyn Migration>
        })
    }

    pub fn source(&self) -> ListSource {
        let mut source = ListSource::new("fixture");
        for (name, metadata, fail) in &self.source_entries {
            source = source.register_with(name.clone(), metadata.clone(), self.factory(name, *fail));
        }
        for name in &self.unversioned {
            source = source.candidate(name.clone(), self.factory(name, Fail::Never));
        }
        source
    }

    pub fn calls(&self) -> Vec<String> {
        snapshot(&self.calls)
    }

    pub fn built(&self) -> Vec<String> {
        snapshot(&self.built)
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

/// Marker names present in `store`, ascending by version.
pub fn applied(store: &InMemoryStore) -> Vec<String> {
    store.markers().into_iter().map(|marker| marker.name).collect()
}

/// Wraps an [`InMemoryStore`] and rejects the commit with the given 1-based number.
pub struct FailingCommitStore {
    inner: InMemoryStore,
    fail_on: usize,
    commits: Arc<AtomicUsize>,
}

impl FailingCommitStore {
    pub fn new(inner: InMemoryStore, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            commits: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn commit_attempts(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for FailingCommitStore {
    fn identity_separator(&self) -> char {
        self.inner.identity_separator()
    }

    async fn open_scope(&self) -> Result<Box<dyn Scope>> {
        Ok(Box::new(FailingScope {
            inner: self.inner.open_scope().await?,
            fail_on: self.fail_on,
            commits: Arc::clone(&self.commits),
        }))
    }
}

struct FailingScope {
    inner: Box<dyn Scope>,
    fail_on: usize,
    commits: Arc<AtomicUsize>,
}

#[async_trait]
impl Scope for FailingScope {
    async fn load(&mut self, id: &str) -> Result<Option<Value>> {
        self.inner.load(id).await
    }

    fn store(&mut self, id: &str, document: Value) {
        self.inner.store(id, document);
    }

    fn delete(&mut self, id: &str) {
        self.inner.delete(id);
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let attempt = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == self.fail_on {
            return Err(MigrationError::other("simulated commit failure"));
        }
        self.inner.commit().await
    }
}
