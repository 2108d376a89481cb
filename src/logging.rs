//! Run logging for the import pipeline.
//!
//! The logger is an injected collaborator passed into
//! [`crate::import::runner::run`] rather than a process-wide singleton, so
//! embedding applications can route pipeline narration wherever they want.
//! Logging is infallible by signature: a misbehaving sink can never abort
//! an import.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Log level for display and filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single timestamped log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Local time the entry was produced
    pub timestamp: DateTime<Local>,
}

impl LogEntry {
    fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Local::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }
}

/// Sink for pipeline log entries.
pub trait ImportLogger {
    fn log(&self, entry: LogEntry);
}

/// Logger printing to stdout, one prefixed line per entry.
#[derive(Debug, Default)]
pub struct StdoutLogger;

impl ImportLogger for StdoutLogger {
    fn log(&self, entry: LogEntry) {
        let prefix = match entry.level {
            LogLevel::Info => " ",
            LogLevel::Success => "✓",
            LogLevel::Warning => "⚠",
            LogLevel::Error => "✗",
        };
        println!(
            "{} {} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            prefix,
            entry.message
        );
    }
}

/// Logger that discards everything. Useful in tests and embedded callers.
#[derive(Debug, Default)]
pub struct NullLogger;

impl ImportLogger for NullLogger {
    fn log(&self, _entry: LogEntry) {}
}

// =============================================================================
// Convenience functions
// =============================================================================

pub fn log_info(logger: &dyn ImportLogger, msg: impl Into<String>) {
    logger.log(LogEntry::info(msg));
}

pub fn log_success(logger: &dyn ImportLogger, msg: impl Into<String>) {
    logger.log(LogEntry::success(msg));
}

pub fn log_warning(logger: &dyn ImportLogger, msg: impl Into<String>) {
    logger.log(LogEntry::warning(msg));
}

pub fn log_error(logger: &dyn ImportLogger, msg: impl Into<String>) {
    logger.log(LogEntry::error(msg));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct CapturingLogger {
        entries: RefCell<Vec<LogEntry>>,
    }

    impl ImportLogger for CapturingLogger {
        fn log(&self, entry: LogEntry) {
            self.entries.borrow_mut().push(entry);
        }
    }

    #[test]
    fn test_entry_levels() {
        let logger = CapturingLogger {
            entries: RefCell::new(Vec::new()),
        };
        log_info(&logger, "reading");
        log_error(&logger, "boom");

        let entries = logger.entries.borrow();
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0].level, LogLevel::Info));
        assert!(matches!(entries[1].level, LogLevel::Error));
        assert_eq!(entries[1].message, "boom");
    }

    #[test]
    fn test_null_logger_is_silent() {
        log_warning(&NullLogger, "ignored");
    }
}
