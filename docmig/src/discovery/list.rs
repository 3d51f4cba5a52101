use std::sync::Arc;

use super::MigrationSource;
use crate::descriptor::{MigrationCandidate, MigrationFactory};
use crate::errors::Result;
use crate::migration::{Migration, MigrationInfo, MigrationMetadata};

/// Explicit, in-code registry of migrations.
///
/// ```rust,no_run
/// # use docmig::{ListSource, MigrationMetadata};
/// # use std::sync::Arc;
/// # fn build(factory: docmig::MigrationFactory) -> ListSource {
/// ListSource::new("billing")
///     .register_with("BackfillInvoices", MigrationMetadata::new(4).with_profile("prod"), factory)
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ListSource {
    name: String,
    candidates: Vec<MigrationCandidate>,
}

impl ListSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            candidates: Vec::new(),
        }
    }

    /// Register a type carrying [`MigrationInfo`], built with `Default`.
    pub fn register<T>(self) -> Self
    where
        T: Migration + MigrationInfo + Default + 'static,
    {
        let factory: MigrationFactory = Arc::new(|| Box::new(T::default()) as Box<dyn Migration>);
        self.register_with(T::NAME, T::metadata(), factory)
    }

    /// Register a migration with metadata attached explicitly.
    pub fn register_with(mut self, name: impl Into<String>, metadata: MigrationMetadata, factory: MigrationFactory) -> Self {
        self.candidates.push(MigrationCandidate::new(name, Some(metadata), factory));
        self
    }

    /// Add a candidate with no version metadata. Discovery excludes it.
    pub fn candidate(mut self, name: impl Into<String>, factory: MigrationFactory) -> Self {
        self.candidates.push(MigrationCandidate::new(name, None, factory));
        self
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl MigrationSource for ListSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn candidates(&self) -> Result<Vec<MigrationCandidate>> {
        Ok(self.candidates.clone())
    }
}
