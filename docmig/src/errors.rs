use std::borrow::Cow;

use thiserror::Error;

use crate::options::Direction;

/// Top-level error type returned by docmig runs.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A migration source could not be enumerated.
    #[error("failed to discover migrations from source '{source_name}': {message}")]
    Discovery { source_name: String, message: String },

    /// Two eligible candidates declared the same version while duplicates are rejected.
    #[error("duplicate migration version {version} declared by '{first}' and '{second}'")]
    DuplicateVersion { version: i64, first: String, second: String },

    /// The resolver could not build an instance for a descriptor.
    #[error("failed to resolve migration '{migration}': {message}")]
    Resolve { migration: String, message: String },

    /// `up()` or `down()` returned an error. The migration's scope was discarded.
    #[error("{direction} migration '{migration}' failed: {source}")]
    Execution {
        migration: String,
        direction: Direction,
        #[source]
        source: Box<MigrationError>,
    },

    /// The store refused to commit the migration's scope.
    #[error("failed to commit migration '{migration}': {source}")]
    Commit {
        migration: String,
        #[source]
        source: Box<MigrationError>,
    },

    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A stored document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be read or is invalid.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

impl MigrationError {
    /// Convenience constructor for errors raised from migration bodies.
    pub fn other(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True when a migration's own `up()`/`down()` failed.
    pub fn is_logic_error(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    /// True when the store failed to commit a migration's scope.
    pub fn is_commit_error(&self) -> bool {
        matches!(self, Self::Commit { .. })
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;
