/*!
 * Explicit logging context.
 *
 * Library code never configures logging globally. Each engine, agent and
 * chunker carries a `LogContext` holding the sink, the verbosity flag and
 * a scope label. The default sink forwards to the `log` facade so the
 * binary's logger decides where output goes; tests swap in a
 * `CaptureSink` and assert on what was recorded.
 */

use log::Level;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Captured log line
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Log level ("error", "warn", "info", "debug")
    pub level: String,

    /// Message text, prefixed with the scope when one is set
    pub message: String,
}

/// Destination for log records
pub trait LogSink: Send + Sync + fmt::Debug {
    fn write(&self, level: Level, message: &str);
}

/// Sink that forwards to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct FacadeSink;

impl LogSink for FacadeSink {
    fn write(&self, level: Level, message: &str) {
        log::log!(target: "llm_translate", level, "{}", message);
    }
}

/// Sink that records entries in memory
#[derive(Debug, Default)]
pub struct CaptureSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Whether any entry at `level` contains `needle`
    pub fn contains(&self, level: &str, needle: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }
}

impl LogSink for CaptureSink {
    fn write(&self, level: Level, message: &str) {
        self.entries.lock().push(LogEntry {
            level: level.as_str().to_lowercase(),
            message: message.to_string(),
        });
    }
}

/// Logging handle passed down the call chain
#[derive(Debug, Clone)]
pub struct LogContext {
    sink: Arc<dyn LogSink>,
    verbose: bool,
    scope: Option<String>,
}

impl Default for LogContext {
    fn default() -> Self {
        Self {
            sink: Arc::new(FacadeSink),
            verbose: false,
            scope: None,
        }
    }
}

impl LogContext {
    /// Context writing to the given sink
    pub fn new(sink: Arc<dyn LogSink>, verbose: bool) -> Self {
        Self { sink, verbose, scope: None }
    }

    /// Context writing to the `log` facade
    pub fn facade(verbose: bool) -> Self {
        Self::new(Arc::new(FacadeSink), verbose)
    }

    /// Derive a child context with a scope label, e.g. "agent"
    pub fn scoped(&self, scope: impl Into<String>) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            verbose: self.verbose,
            scope: Some(scope.into()),
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    fn emit(&self, level: Level, message: &str) {
        match &self.scope {
            Some(scope) => self.sink.write(level, &format!("[{}] {}", scope, message)),
            None => self.sink.write(level, message),
        }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        if self.verbose {
            self.emit(Level::Debug, message.as_ref());
        }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        if self.verbose {
            self.emit(Level::Info, message.as_ref());
        }
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.emit(Level::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.emit(Level::Error, message.as_ref());
    }
}
