//! # Migrations
//!
//! A migration is a unit of forward (`up`) and reverse (`down`) change against
//! a [`DocumentStore`]. Both bodies receive the scope the runner opened for
//! them, so every write they stage is committed together with the marker
//! record in one atomic step.
//!
//! ```rust
//! use docmig::{Migration, MigrationInfo, Result, Scope};
//! use serde_json::json;
//!
//! #[derive(Default, MigrationInfo)]
//! #[migration(version = 1, register = false)]
//! struct SeedSettings;
//!
//! #[async_trait::async_trait]
//! impl Migration for SeedSettings {
//!     async fn up(&mut self, scope: &mut dyn Scope) -> Result<()> {
//!         scope.store("settings/global", json!({ "theme": "dark" }));
//!         Ok(())
//!     }
//!
//!     async fn down(&mut self, scope: &mut dyn Scope) -> Result<()> {
//!         scope.delete("settings/global");
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Version and profiles are attached at registration time, either by the
//! `MigrationInfo` derive or explicitly through [`MigrationMetadata`].

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::Result;
use crate::logger::MigrationLogger;
use crate::store::{DocumentStore, Scope};

/// Collection segment of every marker record id.
pub const MARKER_COLLECTION: &str = "migration_records";

#[async_trait]
pub trait Migration: Send + Sync {
    /// Stable name of the migration. Defaults to the implementing type's name.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Wire the migration to the store and log sink before any logic runs.
    fn setup(&mut self, _store: Arc<dyn DocumentStore>, _logger: Arc<dyn MigrationLogger>) {}

    async fn up(&mut self, scope: &mut dyn Scope) -> Result<()>;

    async fn down(&mut self, _scope: &mut dyn Scope) -> Result<()> {
        Ok(())
    }

    /// Id of this migration's marker record for a store using `separator`.
    fn identity(&self, separator: char) -> String {
        marker_id(self.name(), separator)
    }
}

/// Compile-time metadata, normally produced by `#[derive(MigrationInfo)]`.
pub trait MigrationInfo {
    const NAME: &'static str;
    const VERSION: i64;
    const PROFILES: &'static [&'static str];

    fn metadata() -> MigrationMetadata {
        MigrationMetadata::new(Self::VERSION).with_profiles(Self::PROFILES.iter().copied())
    }
}

/// Version and profile set attached to a migration at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationMetadata {
    pub version: i64,
    pub profiles: BTreeSet<String>,
}

impl MigrationMetadata {
    pub fn new(version: i64) -> Self {
        Self {
            version,
            profiles: BTreeSet::new(),
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profiles.insert(profile.into());
        self
    }

    pub fn with_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles.extend(profiles.into_iter().map(Into::into));
        self
    }
}

/// Deterministic marker id: `migration_records{sep}{snake_case_name}`.
pub fn marker_id(name: &str, separator: char) -> String {
    format!("{MARKER_COLLECTION}{separator}{}", to_snake_case(name))
}

/// `AddUserIndex` -> `add_user_index`, `V2Backfill` -> `v2_backfill`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c.is_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Last path segment of a type name, without generic arguments.
pub(crate) fn short_type_name(full: &str) -> &str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics.rsplit("::").next().unwrap_or(without_generics)
}
