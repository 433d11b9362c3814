//! Diagnostics handle
//!
//! Every component receives a [`Diagnostics`] handle at construction instead of
//! reaching for a global logger. The handle carries:
//! - A shared [`DiagnosticsSink`] that receives formatted messages
//! - A severity filter fixed when the handle is created at startup
//! - A source name (subsystem or routine) prepended by sinks
//!
//! Sinks:
//! - [`LogFacadeSink`]: forwards to the `log` facade (target = source name)
//! - [`MemorySink`]: records messages in memory (always available for testing)
//! - [`NullSink`]: drops everything
//!
//! The `log_*!` macros take the handle as their first argument:
//!
//! ```
//! use robocycle_core::diagnostics::{Diagnostics, LevelFilter, MemorySink};
//! use robocycle_core::log_warn;
//! use std::rc::Rc;
//!
//! let sink = Rc::new(MemorySink::new());
//! let diag = Diagnostics::new(sink.clone(), LevelFilter::Info).scoped("Elevator");
//! log_warn!(diag, "No controller detected");
//! assert_eq!(sink.count(robocycle_core::Level::Warn), 1);
//! ```

use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

pub use log::{Level, LevelFilter};

/// Receiver of leveled diagnostic text
pub trait DiagnosticsSink {
    /// Emit one message. Filtering already happened in [`Diagnostics`].
    fn emit(&self, level: Level, source: &str, message: fmt::Arguments<'_>);
}

/// Cloneable diagnostics handle held by each component
#[derive(Clone)]
pub struct Diagnostics {
    sink: Rc<dyn DiagnosticsSink>,
    filter: LevelFilter,
    source: Rc<str>,
}

impl Diagnostics {
    /// Create the root handle with the process-wide severity filter
    pub fn new(sink: Rc<dyn DiagnosticsSink>, filter: LevelFilter) -> Self {
        Self {
            sink,
            filter,
            source: Rc::from("robocycle"),
        }
    }

    /// Handle that forwards to the `log` facade
    pub fn log_facade(filter: LevelFilter) -> Self {
        Self::new(Rc::new(LogFacadeSink), filter)
    }

    /// Handle that discards all output
    pub fn silent() -> Self {
        Self::new(Rc::new(NullSink), LevelFilter::Off)
    }

    /// Derive a handle for a named component sharing sink and filter
    pub fn scoped(&self, source: &str) -> Self {
        Self {
            sink: Rc::clone(&self.sink),
            filter: self.filter,
            source: Rc::from(source),
        }
    }

    /// Source name attached to every message from this handle
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Severity filter set at startup
    pub fn filter(&self) -> LevelFilter {
        self.filter
    }

    /// Check whether a message at `level` would be emitted
    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.filter
    }

    /// Emit a message if it passes the filter
    pub fn log(&self, level: Level, message: fmt::Arguments<'_>) {
        if self.enabled(level) {
            self.sink.emit(level, &self.source, message);
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("source", &self.source)
            .field("filter", &self.filter)
            .finish()
    }
}

/// Forwards messages to the `log` crate facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacadeSink;

impl DiagnosticsSink for LogFacadeSink {
    fn emit(&self, level: Level, source: &str, message: fmt::Arguments<'_>) {
        log::log!(target: source, level, "[{}] {}", source, message);
    }
}

/// Drops every message
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn emit(&self, _level: Level, _source: &str, _message: fmt::Arguments<'_>) {}
}

/// A message captured by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub level: Level,
    pub source: String,
    pub message: String,
}

/// In-memory sink for tests and post-run inspection
#[derive(Debug, Default)]
pub struct MemorySink {
    records: RefCell<Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured records
    pub fn records(&self) -> Vec<Record> {
        self.records.borrow().clone()
    }

    /// Number of records captured at exactly `level`
    pub fn count(&self, level: Level) -> usize {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.level == level)
            .count()
    }

    /// Whether any record at `level` contains `needle`
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records
            .borrow()
            .iter()
            .any(|r| r.level == level && r.message.contains(needle))
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl DiagnosticsSink for MemorySink {
    fn emit(&self, level: Level, source: &str, message: fmt::Arguments<'_>) {
        self.records.borrow_mut().push(Record {
            level,
            source: String::from(source),
            message: format!("{}", message),
        });
    }
}

/// Log error message through a [`Diagnostics`] handle
#[macro_export]
macro_rules! log_error {
    ($diag:expr, $($arg:tt)*) => {
        $diag.log($crate::diagnostics::Level::Error, format_args!($($arg)*))
    };
}

/// Log warning message through a [`Diagnostics`] handle
#[macro_export]
macro_rules! log_warn {
    ($diag:expr, $($arg:tt)*) => {
        $diag.log($crate::diagnostics::Level::Warn, format_args!($($arg)*))
    };
}

/// Log informational message through a [`Diagnostics`] handle
#[macro_export]
macro_rules! log_info {
    ($diag:expr, $($arg:tt)*) => {
        $diag.log($crate::diagnostics::Level::Info, format_args!($($arg)*))
    };
}

/// Log debug message through a [`Diagnostics`] handle
#[macro_export]
macro_rules! log_debug {
    ($diag:expr, $($arg:tt)*) => {
        $diag.log($crate::diagnostics::Level::Debug, format_args!($($arg)*))
    };
}

/// Log trace message through a [`Diagnostics`] handle
#[macro_export]
macro_rules! log_trace {
    ($diag:expr, $($arg:tt)*) => {
        $diag.log($crate::diagnostics::Level::Trace, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_drops_lower_severity() {
        let sink = Rc::new(MemorySink::new());
        let diag = Diagnostics::new(sink.clone(), LevelFilter::Warn);

        crate::log_error!(diag, "error {}", 1);
        crate::log_warn!(diag, "warn");
        crate::log_info!(diag, "info");
        crate::log_debug!(diag, "debug");

        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.count(Level::Error), 1);
        assert!(sink.contains(Level::Error, "error 1"));
        assert_eq!(sink.count(Level::Info), 0);
    }

    #[test]
    fn test_scoped_shares_sink_and_filter() {
        let sink = Rc::new(MemorySink::new());
        let root = Diagnostics::new(sink.clone(), LevelFilter::Info);
        let elevator = root.scoped("Elevator");

        crate::log_info!(elevator, "Locked");

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, "Elevator");
        assert_eq!(elevator.filter(), LevelFilter::Info);
    }

    #[test]
    fn test_silent_never_enabled() {
        let diag = Diagnostics::silent();
        assert!(!diag.enabled(Level::Error));
        crate::log_error!(diag, "dropped");
    }

    #[test]
    fn test_memory_sink_clear() {
        let sink = Rc::new(MemorySink::new());
        let diag = Diagnostics::new(sink.clone(), LevelFilter::Trace);
        crate::log_trace!(diag, "one");
        sink.clear();
        assert!(sink.records().is_empty());
    }
}
