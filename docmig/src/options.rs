//! Run options: direction, profiles, stop version, resolver, logger and sources.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::DocmigConfig;
use crate::discovery::{MigrationSource, RegisteredSource};
use crate::errors::MigrationError;
use crate::logger::{MigrationLogger, NullLogger};
use crate::resolver::{DefaultResolver, MigrationResolver};

/// Which way a run moves through the migration history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Apply pending migrations in ascending version order.
    #[default]
    Up,
    /// Revert migrations in descending version order.
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

impl FromStr for Direction {
    type Err = MigrationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(MigrationError::config(format!(
                "unknown direction `{other}`, expected `up` or `down`"
            ))),
        }
    }
}

/// What discovery does when two candidates declare the same version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateVersionPolicy {
    /// Log a warning and keep both; they run in discovery order.
    #[default]
    Warn,
    /// Fail discovery with `MigrationError::DuplicateVersion`.
    Reject,
}

/// Options for a single run. Built once and never mutated by the runner.
#[derive(Clone)]
pub struct RunOptions {
    pub direction: Direction,
    pub profiles: Vec<String>,
    pub to_version: Option<i64>,
    pub duplicate_versions: DuplicateVersionPolicy,
    pub resolver: Arc<dyn MigrationResolver>,
    pub logger: Arc<dyn MigrationLogger>,
    /// When empty, the run falls back to [`RegisteredSource`].
    pub sources: Vec<Arc<dyn MigrationSource>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Up,
            profiles: Vec::new(),
            to_version: None,
            duplicate_versions: DuplicateVersionPolicy::Warn,
            resolver: Arc::new(DefaultResolver),
            logger: Arc::new(NullLogger),
            sources: Vec::new(),
        }
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("direction", &self.direction)
            .field("profiles", &self.profiles)
            .field("to_version", &self.to_version)
            .field("duplicate_versions", &self.duplicate_versions)
            .field("sources", &self.sources.iter().map(|s| s.name().to_string()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from the `[migrations]` section of a config file.
    pub fn from_config(config: &DocmigConfig) -> Self {
        Self {
            direction: config.migrations.direction,
            profiles: config.migrations.profiles.clone(),
            to_version: config.migrations.to_version,
            duplicate_versions: config.migrations.duplicate_versions,
            ..Self::default()
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn up(self) -> Self {
        self.with_direction(Direction::Up)
    }

    pub fn down(self) -> Self {
        self.with_direction(Direction::Down)
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profiles.push(profile.into());
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

    /// Stop the run once this version has been processed.
    pub fn to_version(mut self, version: i64) -> Self {
        self.to_version = Some(version);
        self
    }

    pub fn with_duplicate_versions(mut self, policy: DuplicateVersionPolicy) -> Self {
        self.duplicate_versions = policy;
        self
    }

    pub fn with_resolver(mut self, resolver: impl MigrationResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn MigrationLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_source(mut self, source: impl MigrationSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Sources for this run, defaulting to inventory-registered migrations.
    pub fn effective_sources(&self) -> Vec<Arc<dyn MigrationSource>> {
        if self.sources.is_empty() {
            vec![Arc::new(RegisteredSource)]
        } else {
            self.sources.clone()
        }
    }
}
