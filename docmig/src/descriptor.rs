use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::migration::{Migration, MigrationMetadata};

/// Builds a fresh migration instance with no arguments.
pub type MigrationFactory = Arc<dyn Fn() -> Box<dyn Migration> + Send + Sync>;

/// An entry offered by a migration source. Only candidates carrying metadata
/// become descriptors.
#[derive(Clone)]
pub struct MigrationCandidate {
    pub name: String,
    pub metadata: Option<MigrationMetadata>,
    pub factory: MigrationFactory,
}

impl MigrationCandidate {
    pub fn new(name: impl Into<String>, metadata: Option<MigrationMetadata>, factory: MigrationFactory) -> Self {
        Self {
            name: name.into(),
            metadata,
            factory,
        }
    }
}

impl fmt::Debug for MigrationCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationCandidate")
            .field("name", &self.name)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// A discovered migration: version, profiles and how to build it.
///
/// Immutable once discovery returns it.
#[derive(Clone)]
pub struct MigrationDescriptor {
    name: String,
    version: i64,
    profiles: BTreeSet<String>,
    source: String,
    factory: MigrationFactory,
}

impl MigrationDescriptor {
    pub fn new(
        name: impl Into<String>,
        metadata: MigrationMetadata,
        source: impl Into<String>,
        factory: MigrationFactory,
    ) -> Self {
        Self {
            name: name.into(),
            version: metadata.version,
            profiles: metadata.profiles,
            source: source.into(),
            factory,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn profiles(&self) -> &BTreeSet<String> {
        &self.profiles
    }

    /// Name of the source that contributed this descriptor.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// No-argument construction through the descriptor's own factory.
    pub fn instantiate(&self) -> Box<dyn Migration> {
        (self.factory)()
    }
}

impl fmt::Debug for MigrationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationDescriptor")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("profiles", &self.profiles)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
