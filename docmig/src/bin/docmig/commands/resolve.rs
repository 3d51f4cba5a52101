use anyhow::{Context, Result};
use clap::Args;
use docmig::{DocumentStore, MarkerRecord, marker_id};

use super::{ConnectionArgs, ExampleGroup};
use crate::output::OutputManager;
use crate::theme::MarkerState;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Recovery",
    commands: &[
        "docmig resolve AddUserIndex --version 3 --applied   # Record as applied without running",
        "docmig resolve AddUserIndex --rolled-back           # Forget that it was applied",
    ],
}];

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Migration name, as returned by `Migration::name`
    pub migration_name: String,

    /// Version recorded in the marker (required with --applied)
    #[arg(long)]
    pub version: Option<i64>,

    /// Create the marker record
    #[arg(long, conflicts_with = "rolled_back")]
    pub applied: bool,

    /// Delete the marker record
    #[arg(long, conflicts_with = "applied")]
    pub rolled_back: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied { version: i64 },
    RolledBack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Marked,
    Unchanged,
}

impl ResolveArgs {
    fn resolution(&self) -> Result<Resolution> {
        match (self.applied, self.rolled_back, self.version) {
            (true, _, Some(version)) => Ok(Resolution::Applied { version }),
            (true, _, None) => anyhow::bail!("--applied requires --version"),
            (false, true, _) => Ok(Resolution::RolledBack),
            (false, false, _) => anyhow::bail!("Must specify either --applied or --rolled-back"),
        }
    }
}

pub async fn handle_resolve(args: ResolveArgs, output: &OutputManager) -> Result<()> {
    let resolution = args.resolution().inspect_err(|err| output.error(&err.to_string()))?;
    let name = args.migration_name.as_str();

    output.heading(&format!("Resolve Migration: {name}"));

    let store = args.connection.connect(output).await?;
    let outcome = resolve_marker(&store, name, resolution).await?;

    match (resolution, outcome) {
        (Resolution::Applied { .. }, ResolveOutcome::Marked) => {
            output.marker(MarkerState::Applied, &format!("Marked '{name}' as applied"))
        }
        (Resolution::Applied { .. }, ResolveOutcome::Unchanged) => {
            output.warning(&format!("Migration '{name}' is already marked as applied"))
        }
        (Resolution::RolledBack, ResolveOutcome::Marked) => {
            output.marker(MarkerState::RolledBack, &format!("Marked '{name}' as rolled back"))
        }
        (Resolution::RolledBack, ResolveOutcome::Unchanged) => {
            output.warning(&format!("Migration '{name}' is not marked as applied"))
        }
    }

    Ok(())
}

/// Create or delete the marker for `name` in one committed scope.
pub async fn resolve_marker(store: &dyn DocumentStore, name: &str, resolution: Resolution) -> Result<ResolveOutcome> {
    let id = marker_id(name, store.identity_separator());
    let mut scope = store.open_scope().await?;
    let exists = MarkerRecord::exists(scope.as_mut(), &id).await?;

    match (resolution, exists) {
        (Resolution::Applied { .. }, true) | (Resolution::RolledBack, false) => return Ok(ResolveOutcome::Unchanged),
        (Resolution::Applied { version }, false) => MarkerRecord::new(&id, name, version).stage(scope.as_mut())?,
        (Resolution::RolledBack, true) => MarkerRecord::stage_delete(scope.as_mut(), &id),
    }

    scope.commit().await.with_context(|| format!("Failed to update marker {id}"))?;
    log::debug!("resolved {id} as {resolution:?}");
    Ok(ResolveOutcome::Marked)
}
