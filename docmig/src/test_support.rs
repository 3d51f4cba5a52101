//! Fixtures shared by the unit tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::descriptor::{MigrationDescriptor, MigrationFactory};
use crate::errors::Result;
use crate::migration::{Migration, MigrationMetadata};
use crate::store::Scope;

pub struct Noop;

#[async_trait]
impl Migration for Noop {
    async fn up(&mut self, _scope: &mut dyn Scope) -> Result<()> {
        Ok(())
    }
}

pub fn noop_factory() -> MigrationFactory {
    Arc::new(|| Box::new(Noop) as Box<dyn Migration>)
}

/// Descriptor from the `"test"` source that builds a [`Noop`].
pub fn descriptor(name: &str, version: i64, profiles: &[&str]) -> MigrationDescriptor {
    let metadata = MigrationMetadata::new(version).with_profiles(profiles.iter().copied());
    MigrationDescriptor::new(name, metadata, "test", noop_factory())
}
