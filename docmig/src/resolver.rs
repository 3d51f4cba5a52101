//! Turns a descriptor into a runnable migration.
//!
//! The default resolver builds with no arguments. Applications that need to
//! inject dependencies provide their own resolver, either a closure or an
//! [`OverrideResolver`] keyed by migration name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::descriptor::{MigrationDescriptor, MigrationFactory};
use crate::errors::Result;
use crate::migration::Migration;

pub trait MigrationResolver: Send + Sync {
    fn resolve(&self, descriptor: &MigrationDescriptor) -> Result<Box<dyn Migration>>;
}

impl<F> MigrationResolver for F
where
    F: Fn(&MigrationDescriptor) -> Result<Box<dyn Migration>> + Send + Sync,
{
    fn resolve(&self, descriptor: &MigrationDescriptor) -> Result<Box<dyn Migration>> {
        self(descriptor)
    }
}

/// No-argument construction through the descriptor's factory.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResolver;

impl MigrationResolver for DefaultResolver {
    fn resolve(&self, descriptor: &MigrationDescriptor) -> Result<Box<dyn Migration>> {
        Ok(descriptor.instantiate())
    }
}

/// Uses an injected factory when one is registered for the migration's name,
/// otherwise falls back to the descriptor's own factory.
#[derive(Clone, Default)]
pub struct OverrideResolver {
    overrides: HashMap<String, MigrationFactory>,
}

impl OverrideResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Migration> + Send + Sync + 'static,
    {
        self.overrides.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn has_override(&self, name: &str) -> bool {
        self.overrides.contains_key(name)
    }
}

impl fmt::Debug for OverrideResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.overrides.keys().collect();
        names.sort();
        f.debug_struct("OverrideResolver").field("overrides", &names).finish()
    }
}

impl MigrationResolver for OverrideResolver {
    fn resolve(&self, descriptor: &MigrationDescriptor) -> Result<Box<dyn Migration>> {
        match self.overrides.get(descriptor.name()) {
            Some(factory) => Ok(factory()),
            None => Ok(descriptor.instantiate()),
        }
    }
}
