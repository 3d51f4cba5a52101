//! Migration auto-registration via the inventory crate.
//!
//! `#[derive(MigrationInfo)]` submits a [`RegisteredMigration`] for every
//! migration type it sees, so a binary can run everything linked into it
//! without listing types by hand.

use std::any::TypeId;
use std::sync::Arc;

use super::MigrationSource;
use crate::descriptor::{MigrationCandidate, MigrationFactory};
use crate::errors::Result;
use crate::migration::{Migration, MigrationMetadata};

/// Registration entry submitted by the `MigrationInfo` derive.
pub struct RegisteredMigration {
    /// Returns the TypeId of the migration struct
    pub type_id: fn() -> TypeId,
    /// The name of the migration type (e.g., "AddUserIndex")
    pub type_name: &'static str,
    pub version: i64,
    pub profiles: &'static [&'static str],
    /// Builds the migration with `Default`
    pub factory: fn() -> Box<dyn Migration>,
}

inventory::collect!(RegisteredMigration);

impl RegisteredMigration {
    pub fn metadata(&self) -> MigrationMetadata {
        MigrationMetadata::new(self.version).with_profiles(self.profiles.iter().copied())
    }
}

/// Get all registered migrations, in link order.
pub fn registered_migrations() -> impl Iterator<Item = &'static RegisteredMigration> {
    inventory::iter::<RegisteredMigration>()
}

/// Check if a migration type is registered.
pub fn is_migration_registered<T: 'static>() -> bool {
    let type_id = TypeId::of::<T>();
    registered_migrations().any(|m| (m.type_id)() == type_id)
}

/// Factory used by generated registrations.
pub fn instantiate<T>() -> Box<dyn Migration>
where
    T: Migration + Default + 'static,
{
    Box::new(T::default())
}

/// Every migration registered through the derive, ordered by type name so
/// equal versions keep a reproducible discovery order across builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisteredSource;

impl MigrationSource for RegisteredSource {
    fn name(&self) -> &str {
        "registered"
    }

    fn candidates(&self) -> Result<Vec<MigrationCandidate>> {
        let mut registered: Vec<&'static RegisteredMigration> = registered_migrations().collect();
        registered.sort_by_key(|m| m.type_name);

        Ok(registered
            .into_iter()
            .map(|m| {
                let build = m.factory;
                let factory: MigrationFactory = Arc::new(build);
                MigrationCandidate::new(m.type_name, Some(m.metadata()), factory)
            })
            .collect())
    }
}
