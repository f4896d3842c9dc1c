//! Logger adapter forwarding registry-client diagnostics to a host sink

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Tag prefixed to every forwarded message
pub const LOG_TAG: &str = "registry-client";

/// Severity levels accepted by the registry logger
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Verbose,
    Information,
    Minimal,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "verbose",
            LogLevel::Information => "information",
            LogLevel::Minimal => "minimal",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Structured log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub level: LogLevel,
    pub code: Option<String>,
    pub project_path: Option<PathBuf>,
    pub message: String,
}

impl LogMessage {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            code: None,
            project_path: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_project_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_path = Some(path.into());
        self
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref code) = self.code {
            write!(f, "{}: ", code)?;
        }
        if let Some(ref path) = self.project_path {
            write!(f, "{}: ", path.display())?;
        }
        f.write_str(&self.message)
    }
}

/// Host-provided diagnostics sink
pub trait DiagnosticsSink: Send + Sync {
    fn debug(&self, message: &str);
    fn verbose(&self, message: &str);
    fn information(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Sink forwarding to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn debug(&self, message: &str) {
        tracing::debug!("{}", message);
    }

    fn verbose(&self, message: &str) {
        tracing::trace!("{}", message);
    }

    fn information(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Registry-client logger.
///
/// All calls funnel through [`RegistryLogger::log`], which holds the lock while
/// the sink runs. Logging never fails the caller.
pub struct RegistryLogger {
    sink: Arc<dyn DiagnosticsSink>,
    lock: Mutex<()>,
}

impl RegistryLogger {
    pub fn new(sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            sink,
            lock: Mutex::new(()),
        }
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        let line = format!("{}: {}", LOG_TAG, message);
        // A panic in another logging call must not silence this one
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match level {
            LogLevel::Debug => self.sink.debug(&line),
            LogLevel::Verbose => self.sink.verbose(&line),
            LogLevel::Information | LogLevel::Minimal => self.sink.information(&line),
            LogLevel::Warning => self.sink.warning(&line),
            LogLevel::Error => self.sink.error(&line),
        }
    }

    pub fn log_message(&self, message: &LogMessage) {
        self.log(message.level, &message.to_string());
    }

    pub fn log_debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn log_verbose(&self, message: &str) {
        self.log(LogLevel::Verbose, message);
    }

    pub fn log_information(&self, message: &str) {
        self.log(LogLevel::Information, message);
    }

    pub fn log_minimal(&self, message: &str) {
        self.log(LogLevel::Minimal, message);
    }

    pub fn log_warning(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    pub fn log_error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    pub fn log_summary(&self, message: &str) {
        self.log(LogLevel::Information, message);
    }
}

impl fmt::Debug for RegistryLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryLogger").finish_non_exhaustive()
    }
}

/// Sink that records every line, for tests and embedding hosts
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded lines with the sink severity they arrived at
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines
            .lock()
            .map(|l| l.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn push(&self, level: LogLevel, message: &str) {
        let mut lines = self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        lines.push((level, message.to_string()));
    }
}

impl DiagnosticsSink for MemorySink {
    fn debug(&self, message: &str) {
        self.push(LogLevel::Debug, message);
    }

    fn verbose(&self, message: &str) {
        self.push(LogLevel::Verbose, message);
    }

    fn information(&self, message: &str) {
        self.push(LogLevel::Information, message);
    }

    fn warning(&self, message: &str) {
        self.push(LogLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.push(LogLevel::Error, message);
    }
}
