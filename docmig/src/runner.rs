//! # Migration Runner
//!
//! Discovery, profile filter and ordering produce the plan; the runner then
//! walks it one migration at a time:
//!
//! 1. resolve the instance and call `setup(store, logger)`
//! 2. compute the marker id with the store's separator
//! 3. open a scope for this migration only and load its marker
//! 4. Up: skip when the marker exists, else `up()` and stage the marker.
//!    Down: `down()` and stage the marker's deletion
//! 5. commit the scope, so the migration's writes and the marker change land together
//! 6. stop once `to_version` has been processed
//!
//! Any failure in `up`/`down` or in the commit drops the scope and ends the
//! run. Migrations committed earlier in the run stay committed.
//!
//! Two runners racing on the same store can both see an absent marker and
//! both apply `up()`. Callers that run more than one runner at a time need
//! their own mutual exclusion.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::descriptor::MigrationDescriptor;
use crate::discovery::discover;
use crate::errors::{MigrationError, Result};
use crate::filter::filter_eligible;
use crate::options::{Direction, RunOptions};
use crate::ordering::order_for;
use crate::store::{DocumentStore, MarkerRecord};

/// A migration the run applied or reverted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationOutcome {
    pub name: String,
    pub version: i64,
    pub marker_id: String,
    pub execution_time_ms: u64,
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub direction: Direction,
    /// Migrations whose `up()` committed in this run.
    pub applied: Vec<MigrationOutcome>,
    /// Migrations whose `down()` committed in this run.
    pub reverted: Vec<MigrationOutcome>,
    /// Names of migrations skipped because their marker already existed.
    pub skipped: Vec<String>,
    /// Set when the run stopped at `to_version`.
    pub stopped_at: Option<i64>,
    pub total_time_ms: u64,
}

impl RunReport {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            applied: Vec::new(),
            reverted: Vec::new(),
            skipped: Vec::new(),
            stopped_at: None,
            total_time_ms: 0,
        }
    }

    /// Migrations that changed state in this run, in execution order.
    pub fn executed(&self) -> &[MigrationOutcome] {
        match self.direction {
            Direction::Up => &self.applied,
            Direction::Down => &self.reverted,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.reverted.is_empty()
    }
}

enum Step {
    Executed(MigrationOutcome),
    Skipped(String),
}

pub struct Runner {
    store: Arc<dyn DocumentStore>,
}

impl Runner {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Discover, filter and order without touching the store.
    ///
    /// # Errors
    ///
    /// * If a source cannot be enumerated
    /// * If duplicate versions are found while they are rejected
    pub fn plan(&self, options: &RunOptions) -> Result<Vec<MigrationDescriptor>> {
        let sources = options.effective_sources();
        let discovered = discover(&sources, options.duplicate_versions, options.logger.as_ref())?;
        let discovered_count = discovered.len();

        let eligible = filter_eligible(discovered, &options.profiles);
        log::debug!(
            "{} of {discovered_count} discovered migration(s) eligible for profiles {:?}",
            eligible.len(),
            options.profiles
        );

        Ok(order_for(eligible, options.direction))
    }

    /// Run the plan for `options` against the store.
    ///
    /// # Errors
    ///
    /// * Any error from [`Runner::plan`], before anything executes
    /// * `Resolve` if an instance cannot be built
    /// * `Execution` if a migration's `up()`/`down()` fails
    /// * `Commit` if the store rejects a migration's scope
    pub async fn run(&self, options: &RunOptions) -> Result<RunReport> {
        let start = Instant::now();
        let plan = self.plan(options)?;
        let mut report = RunReport::new(options.direction);

        for descriptor in &plan {
            match self.execute(descriptor, options).await? {
                Step::Executed(outcome) => match options.direction {
                    Direction::Up => report.applied.push(outcome),
                    Direction::Down => report.reverted.push(outcome),
                },
                Step::Skipped(name) => report.skipped.push(name),
            }

            if options.to_version == Some(descriptor.version()) {
                report.stopped_at = Some(descriptor.version());
                break;
            }
        }

        report.total_time_ms = elapsed_ms(start);
        Ok(report)
    }

    async fn execute(&self, descriptor: &MigrationDescriptor, options: &RunOptions) -> Result<Step> {
        let logger = options.logger.as_ref();

        let mut migration = options.resolver.resolve(descriptor).map_err(|err| match err {
            MigrationError::Resolve { .. } => err,
            other => MigrationError::Resolve {
                migration: descriptor.name().to_string(),
                message: other.to_string(),
            },
        })?;
        migration.setup(Arc::clone(&self.store), Arc::clone(&options.logger));

        let name = migration.name().to_string();
        let marker_id = migration.identity(self.store.identity_separator());

        let mut scope = self.store.open_scope().await?;
        let applied = MarkerRecord::exists(scope.as_mut(), &marker_id).await?;

        let started = Instant::now();
        match options.direction {
            Direction::Down => {
                if !applied {
                    logger.write_warning(format_args!("{name}: no marker record found, reverting anyway"));
                }

                logger.write_information(format_args!("{name}: Down migration started"));
                if let Err(err) = migration.down(scope.as_mut()).await {
                    logger.write_error(format_args!("{name}: Down migration failed: {err}"));
                    return Err(MigrationError::Execution {
                        migration: name,
                        direction: Direction::Down,
                        source: Box::new(err),
                    });
                }
                MarkerRecord::stage_delete(scope.as_mut(), &marker_id);
            }
            Direction::Up => {
                if applied {
                    log::debug!("{name} (v{}) already applied, skipping", descriptor.version());
                    return Ok(Step::Skipped(name));
                }

                logger.write_information(format_args!("{name}: Up migration started"));
                if let Err(err) = migration.up(scope.as_mut()).await {
                    logger.write_error(format_args!("{name}: Up migration failed: {err}"));
                    return Err(MigrationError::Execution {
                        migration: name,
                        direction: Direction::Up,
                        source: Box::new(err),
                    });
                }
                MarkerRecord::new(&marker_id, &name, descriptor.version())
                    .with_execution_time(elapsed_ms(started))
                    .stage(scope.as_mut())?;
            }
        }

        if let Err(err) = scope.commit().await {
            logger.write_error(format_args!("{name}: {} migration could not be committed: {err}", capitalized(options.direction)));
            return Err(MigrationError::Commit {
                migration: name,
                source: Box::new(err),
            });
        }

        let execution_time_ms = elapsed_ms(started);
        logger.write_information(format_args!("{name}: {} migration completed", capitalized(options.direction)));

        Ok(Step::Executed(MigrationOutcome {
            name,
            version: descriptor.version(),
            marker_id,
            execution_time_ms,
        }))
    }
}

/// Run `options` against `store` with a fresh [`Runner`].
pub async fn run(store: Arc<dyn DocumentStore>, options: &RunOptions) -> Result<RunReport> {
    Runner::new(store).run(options).await
}

fn capitalized(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "Up",
        Direction::Down => "Down",
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
