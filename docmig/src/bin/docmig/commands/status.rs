use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use docmig::MarkerRecord;
use serde::Serialize;

use super::{ConnectionArgs, ExampleGroup};
use crate::output::{OutputManager, TableDisplay};
use crate::theme::MarkerState;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Inspect",
    commands: &[
        "docmig status                  # Applied migrations as a table",
        "docmig --output json status    # Marker records as JSON",
    ],
}];

#[derive(Args, Debug, Clone, Default)]
pub struct StatusArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Applied migrations, ascending by version.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct AppliedMigrations(pub Vec<MarkerRecord>);

fn marker_state(marker: &MarkerRecord) -> MarkerState {
    if marker.name.is_empty() { MarkerState::Bare } else { MarkerState::Applied }
}

impl TableDisplay for AppliedMigrations {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["State", "Version", "Name", "Applied At", "Time (ms)", "Record"]);
        for marker in &self.0 {
            let state = marker_state(marker);
            table.add_row(vec![
                Cell::new(format!("{} {}", state.icon(), state.label())),
                Cell::new(marker.version),
                Cell::new(&marker.name),
                Cell::new(
                    marker
                        .applied_at
                        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::new(marker.execution_time_ms),
                Cell::new(&marker.id),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        match self.0.last() {
            Some(latest) => format!("{} applied, latest v{} {}", self.0.len(), latest.version, latest.name),
            None => "0 applied".to_string(),
        }
    }
}

pub async fn handle_status(args: StatusArgs, output: &OutputManager) -> Result<()> {
    output.heading("Migration Status");

    let store = args.connection.connect(output).await?;
    let markers = store.list_markers().await?;

    if markers.is_empty() && !output.is_json() {
        output.warning("No migrations have been applied");
        return Ok(());
    }

    output.display(&AppliedMigrations(markers))
}
