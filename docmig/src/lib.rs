//! docmig core library.
//!
//! Versioned, idempotent data migrations for document stores: discovery,
//! profile filtering, ordering and a runner that commits each migration
//! together with its marker record.

extern crate self as docmig;

pub mod cli;
pub mod config;
pub mod descriptor;
pub mod discovery;
pub mod errors;
pub mod filter;
pub mod logger;
pub mod migration;
pub mod options;
pub mod ordering;
pub mod resolver;
pub mod runner;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::DocmigConfig;
pub use descriptor::{MigrationCandidate, MigrationDescriptor, MigrationFactory};
pub use discovery::{ListSource, MigrationSource, RegisteredMigration, RegisteredSource, discover};
pub use errors::*;
pub use logger::{LogEntry, LogLevel, LogLogger, MemoryLogger, MigrationLogger, NullLogger};
pub use migration::{MARKER_COLLECTION, Migration, MigrationInfo, MigrationMetadata, marker_id};
pub use options::{Direction, DuplicateVersionPolicy, RunOptions};
pub use resolver::{DefaultResolver, MigrationResolver, OverrideResolver};
pub use runner::{MigrationOutcome, RunReport, Runner, run};
pub use store::{DocumentStore, InMemoryStore, MarkerRecord, RedisStore, Scope};

// Derive macro shares the trait's name, like serde's Serialize.
pub use docmig_macros::MigrationInfo;

pub use async_trait::async_trait;
pub use inventory;
pub use redis;
