//! Building blocks for an application's own `migrate` binary.
//!
//! Migrations register themselves through the derive, so they only exist in
//! binaries that link the application's code. An application wires this up
//! in a few lines:
//!
//! ```no_run
//! use clap::Parser;
//! use docmig::cli::{MigrateArgs, execute};
//!
//! #[derive(Parser)]
//! struct Cli {
//!     #[command(flatten)]
//!     migrate: MigrateArgs,
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     env_logger::init();
//!     let outcome = execute(Cli::parse().migrate).await?;
//!     println!("{outcome}");
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::config::DocmigConfig;
use crate::descriptor::MigrationDescriptor;
use crate::logger::LogLogger;
use crate::options::{Direction, RunOptions};
use crate::ordering::through_target;
use crate::runner::{RunReport, Runner};
use crate::store::{DocumentStore, InMemoryStore, RedisStore};

#[derive(Debug, Clone, Default, Args)]
pub struct MigrateArgs {
    /// Path to a config file (defaults to .docmig/config.toml in the project root)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Direction of the run: up or down
    #[arg(long)]
    pub direction: Option<Direction>,

    /// Profile to enable; repeat for more than one
    #[arg(long = "profile")]
    pub profiles: Vec<String>,

    /// Stop after the migration with this version
    #[arg(long)]
    pub to_version: Option<i64>,

    /// Redis connection URL (overrides the config file)
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Print the plan without touching the store
    #[arg(long)]
    pub dry_run: bool,
}

impl MigrateArgs {
    pub fn load_config(&self) -> Result<DocmigConfig> {
        match &self.config {
            Some(path) => DocmigConfig::load(path).with_context(|| format!("Failed to load {}", path.display())),
            None => {
                let current_dir = std::env::current_dir().context("Failed to get current directory")?;
                DocmigConfig::discover_from(&current_dir).context("Failed to load project config")
            }
        }
    }

    /// Options from `config`, with command-line flags taking precedence.
    pub fn run_options(&self, config: &DocmigConfig) -> RunOptions {
        let mut options = RunOptions::from_config(config).with_logger(Arc::new(LogLogger));
        if let Some(direction) = self.direction {
            options = options.with_direction(direction);
        }
        if !self.profiles.is_empty() {
            options.profiles = self.profiles.clone();
        }
        if let Some(version) = self.to_version {
            options = options.to_version(version);
        }
        options
    }

    pub fn redis_url(&self, config: &DocmigConfig) -> Result<String> {
        match &self.redis_url {
            Some(url) => Ok(url.clone()),
            None => config.redis_url().context("REDIS_URL is required to run migrations"),
        }
    }
}

/// One entry of a dry-run plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMigration {
    pub name: String,
    pub version: i64,
    pub profiles: Vec<String>,
    pub source: String,
}

impl From<&MigrationDescriptor> for PlannedMigration {
    fn from(descriptor: &MigrationDescriptor) -> Self {
        Self {
            name: descriptor.name().to_string(),
            version: descriptor.version(),
            profiles: descriptor.profiles().iter().cloned().collect(),
            source: descriptor.source().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MigrateOutcome {
    Planned { direction: Direction, migrations: Vec<PlannedMigration> },
    Ran(RunReport),
}

impl fmt::Display for MigrateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrateOutcome::Planned { direction, migrations } => {
                writeln!(f, "{} migration(s) would run {direction}:", migrations.len())?;
                for migration in migrations {
                    write!(f, "  v{} {}", migration.version, migration.name)?;
                    if !migration.profiles.is_empty() {
                        write!(f, " [{}]", migration.profiles.join(", "))?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            MigrateOutcome::Ran(report) => {
                let verb = match report.direction {
                    Direction::Up => "applied",
                    Direction::Down => "reverted",
                };
                write!(f, "{} migration(s) {verb} in {}ms", report.executed().len(), report.total_time_ms)?;
                if !report.skipped.is_empty() {
                    write!(f, ", {} already applied", report.skipped.len())?;
                }
                if let Some(version) = report.stopped_at {
                    write!(f, ", stopped at version {version}")?;
                }
                Ok(())
            }
        }
    }
}

/// Load config, merge flags, connect to Redis and run (or plan) the registered migrations.
pub async fn execute(args: MigrateArgs) -> Result<MigrateOutcome> {
    let config = args.load_config()?;
    let options = args.run_options(&config);

    if args.dry_run {
        return plan(&options);
    }

    let redis_url = args.redis_url(&config)?;
    let store = RedisStore::connect(&redis_url, &config.redis.key_prefix)
        .await
        .context("Failed to connect to Redis")?;

    execute_with_store(&args, &options, Arc::new(store)).await
}

/// Same as [`execute`] against an already-open store.
pub async fn execute_with_store(
    args: &MigrateArgs,
    options: &RunOptions,
    store: Arc<dyn DocumentStore>,
) -> Result<MigrateOutcome> {
    if args.dry_run {
        return plan(options);
    }

    let report = Runner::new(store).run(options).await?;
    log::info!(
        "{} run finished: {} executed, {} skipped",
        report.direction,
        report.executed().len(),
        report.skipped.len()
    );
    Ok(MigrateOutcome::Ran(report))
}

fn plan(options: &RunOptions) -> Result<MigrateOutcome> {
    // planning never opens a scope
    let runner = Runner::new(Arc::new(InMemoryStore::new()));
    let migrations = through_target(runner.plan(options)?, options.to_version)
        .iter()
        .map(PlannedMigration::from)
        .collect();
    Ok(MigrateOutcome::Planned {
        direction: options.direction,
        migrations,
    })
}
