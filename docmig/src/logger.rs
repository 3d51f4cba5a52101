//! Log sinks handed to the runner and to each migration's `setup`.
//!
//! Messages are format-string style (`format_args!`) with no structured fields.

use std::fmt;
use std::sync::Mutex;

/// Sink for the user-visible progress lines of a run.
pub trait MigrationLogger: Send + Sync {
    fn write_information(&self, args: fmt::Arguments<'_>);

    fn write_warning(&self, args: fmt::Arguments<'_>);

    fn write_error(&self, args: fmt::Arguments<'_>);
}

/// Discards everything. Used when no logger is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl MigrationLogger for NullLogger {
    fn write_information(&self, _args: fmt::Arguments<'_>) {}

    fn write_warning(&self, _args: fmt::Arguments<'_>) {}

    fn write_error(&self, _args: fmt::Arguments<'_>) {}
}

/// Forwards to the `log` facade under the `docmig` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLogger;

impl MigrationLogger for LogLogger {
    fn write_information(&self, args: fmt::Arguments<'_>) {
        log::info!(target: "docmig", "{args}");
    }

    fn write_warning(&self, args: fmt::Arguments<'_>) {
        log::warn!(target: "docmig", "{args}");
    }

    fn write_error(&self, args: fmt::Arguments<'_>) {
        log::error!(target: "docmig", "{args}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Information,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Keeps every line in memory, in order.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map(|entries| entries.clone()).unwrap_or_default()
    }

    /// Messages only, in the order they were written.
    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|entry| entry.message).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|entry| entry.message.contains(needle))
    }

    fn push(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level,
                message: args.to_string(),
            });
        }
    }
}

impl MigrationLogger for MemoryLogger {
    fn write_information(&self, args: fmt::Arguments<'_>) {
        self.push(LogLevel::Information, args);
    }

    fn write_warning(&self, args: fmt::Arguments<'_>) {
        self.push(LogLevel::Warning, args);
    }

    fn write_error(&self, args: fmt::Arguments<'_>) {
        self.push(LogLevel::Error, args);
    }
}
