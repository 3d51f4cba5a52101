use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use serde::Serialize;
use std::io::Write;

use crate::theme::{CAUTION_ICON, FAILURE_ICON, HINT_ICON, MarkerState, OK_ICON, PALETTE, PROGRESS_ICON};

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// Compact single-line output
    Compact,
}

#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub no_color: bool,
}

/// Data that can be rendered in every output format
pub trait TableDisplay {
    fn to_table(&self, output: &OutputManager) -> Table;
    fn to_compact(&self) -> String;
}

pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.options.output_format, OutputFormat::Json)
    }

    /// Display data according to the configured output format
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => {
                println!("{}", data.to_table(self));
            }
            OutputFormat::Compact => {
                println!("{}", data.to_compact());
            }
        }
        Ok(())
    }

    fn line(&self, icon: &str, color: colored::Color, message: &str) -> String {
        if self.options.no_color {
            format!("{icon} {message}")
        } else {
            format!("{} {}", icon.color(color), message.color(color))
        }
    }

    // Status lines stay off stdout in JSON mode so the document is parseable.
    fn chatter_allowed(&self) -> bool {
        !self.options.quiet && !self.is_json()
    }

    pub fn success(&self, message: &str) {
        if self.chatter_allowed() {
            println!("{}", self.line(OK_ICON, PALETTE.ok, message));
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{}", self.line(FAILURE_ICON, PALETTE.failure, message));
    }

    pub fn warning(&self, message: &str) {
        if self.chatter_allowed() {
            println!("{}", self.line(CAUTION_ICON, PALETTE.caution, message));
        }
    }

    /// Report a marker change, drawn with the state's icon and color.
    pub fn marker(&self, state: MarkerState, message: &str) {
        if self.chatter_allowed() {
            println!("{}", self.line(state.icon(), state.color(), message));
        }
    }

    pub fn heading(&self, text: &str) {
        if self.chatter_allowed() {
            let output = if self.options.no_color {
                format!("\n{text}\n{}", "=".repeat(text.chars().count()))
            } else {
                format!("\n{}", text.color(PALETTE.heading).bold())
            };
            println!("{output}");
        }
    }

    pub fn key_value(&self, key: &str, value: &str) {
        if self.chatter_allowed() {
            let output = if self.options.no_color {
                format!("{key}: {value}")
            } else {
                format!("{}: {}", key.color(PALETTE.label).bold(), value.color(PALETTE.text))
            };
            println!("{output}");
        }
    }

    pub fn bullet(&self, text: &str) {
        if self.chatter_allowed() {
            let output = if self.options.no_color {
                format!("  {HINT_ICON} {text}")
            } else {
                format!("  {} {text}", HINT_ICON.color(PALETTE.placeholder))
            };
            println!("{output}");
        }
    }

    pub fn create_table(&self) -> Table {
        let mut table = Table::new();
        if self.options.no_color {
            table.load_preset(comfy_table::presets::ASCII_FULL);
        } else {
            table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
        }
        table
    }

    pub fn add_table_header(&self, table: &mut Table, headers: &[&str]) {
        let header_cells: Vec<Cell> = headers
            .iter()
            .map(|h| {
                let cell = Cell::new(h).add_attribute(Attribute::Bold);
                if self.options.no_color { cell } else { cell.fg(TableColor::Cyan) }
            })
            .collect();
        table.set_header(header_cells);
    }

    pub fn progress(&self, message: &str) {
        if !self.chatter_allowed() {
            return;
        }

        let output = if self.options.no_color {
            format!("{PROGRESS_ICON} {message}...")
        } else {
            format!(
                "{} {}...",
                PROGRESS_ICON.color(PALETTE.progress).bold(),
                message.color(PALETTE.progress)
            )
        };

        print!("\r{output}");
        std::io::stdout().flush().ok();
    }

    pub fn clear_line(&self) {
        if !self.chatter_allowed() {
            return;
        }

        print!("\r{}\r", " ".repeat(80));
        std::io::stdout().flush().ok();
    }
}
