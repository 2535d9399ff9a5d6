//! Hierarchical loggers for lint passes.
//!
//! Every message is attributed to a scope: the repository as a whole, one
//! package, or one rule (optionally on one package). Loggers only carry the
//! scope; rendering is delegated to a [`LogSink`] so the console binary and
//! tests can observe the same records.

use crate::models::Package;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Message severity, ordered from least to most verbose.
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    /// Equivalent filter for the `log` facade.
    pub const fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Trace,
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug | log::Level::Trace => LogLevel::Debug,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level '{other}' (expected debug|info|warn|error)")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// A message with optional structured content and an underlying cause.
pub struct LogMessage {
    pub message: String,
    pub additional_content: Vec<String>,
    pub error: Option<String>,
}

impl LogMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            additional_content: Vec::new(),
            error: None,
        }
    }

    pub fn with_content<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.additional_content
            .extend(lines.into_iter().map(Into::into));
        self
    }

    /// Attach an error, flattening its `source()` chain into one line.
    pub fn with_error(mut self, err: &dyn std::error::Error) -> Self {
        let mut text = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            text.push_str(": ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        self.error = Some(text);
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.error = Some(cause.into());
        self
    }
}

impl From<&str> for LogMessage {
    fn from(message: &str) -> Self {
        LogMessage::new(message)
    }
}

impl From<String> for LogMessage {
    fn from(message: String) -> Self {
        LogMessage::new(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One emitted message together with its scope.
pub struct LogRecord {
    pub level: LogLevel,
    pub package: Option<String>,
    pub rule: Option<String>,
    pub message: LogMessage,
}

/// Destination for log records.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: LogRecord);
}

#[derive(Clone)]
/// A logger bound to a scope (repository, package, or rule).
pub struct Logger {
    sink: Arc<dyn LogSink>,
    package: Option<String>,
    rule: Option<String>,
}

impl Logger {
    pub fn log(&self, level: LogLevel, message: impl Into<LogMessage>) {
        self.sink.emit(LogRecord {
            level,
            package: self.package.clone(),
            rule: self.rule.clone(),
            message: message.into(),
        });
    }

    pub fn debug(&self, message: impl Into<LogMessage>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<LogMessage>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<LogMessage>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<LogMessage>) {
        self.log(LogLevel::Error, message);
    }
}

#[derive(Clone)]
/// Factory for scoped loggers sharing one sink.
pub struct Loggers {
    sink: Arc<dyn LogSink>,
}

impl Loggers {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    pub fn root(&self) -> Logger {
        self.scoped(None, None)
    }

    pub fn for_package(&self, package: &Package) -> Logger {
        self.scoped(Some(package), None)
    }

    pub fn for_rule(&self, rule_id: &str, package: Option<&Package>) -> Logger {
        self.scoped(package, Some(rule_id))
    }

    fn scoped(&self, package: Option<&Package>, rule: Option<&str>) -> Logger {
        Logger {
            sink: Arc::clone(&self.sink),
            package: package.map(|p| p.label().to_string()),
            rule: rule.map(str::to_string),
        }
    }
}

#[derive(Default)]
/// Sink that keeps every record in memory.
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records at exactly `level`.
    pub fn at(&self, level: LogLevel) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .collect()
    }

    /// Whether any record at `level` has a title containing `needle`.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.at(level)
            .iter()
            .any(|r| r.message.message.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn package(path: &str, name: Option<&str>) -> Package {
        Package {
            name: name.map(str::to_string),
            relative_path: path.to_string(),
            config: None,
        }
    }

    #[test]
    fn test_scopes_are_attached_to_records() {
        let sink = Arc::new(MemorySink::new());
        let loggers = Loggers::new(sink.clone());
        let p = package("packages/a", Some("@acme/a"));

        loggers.root().info("root");
        loggers.for_package(&p).warn("pkg");
        loggers.for_rule("ts-config", Some(&p)).error("rule");
        loggers.for_rule("dependency-versions", None).debug("repo rule");

        let records = sink.records();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].package, None);
        assert_eq!(records[1].package.as_deref(), Some("@acme/a"));
        assert_eq!(records[2].rule.as_deref(), Some("ts-config"));
        assert_eq!(records[3].package, None);
        assert_eq!(records[3].rule.as_deref(), Some("dependency-versions"));
    }

    #[test]
    fn test_unnamed_package_uses_path_as_label() {
        let sink = Arc::new(MemorySink::new());
        let loggers = Loggers::new(sink.clone());
        loggers.for_package(&package("tools/x", None)).info("hi");
        assert_eq!(sink.records()[0].package.as_deref(), Some("tools/x"));
    }

    #[test]
    fn test_with_error_flattens_source_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("outer")]
        struct Outer(#[source] io::Error);

        let err = Outer(io::Error::new(io::ErrorKind::Other, "inner"));
        let msg = LogMessage::new("failed").with_error(&err);
        assert_eq!(msg.error.as_deref(), Some("outer: inner"));
    }

    #[test]
    fn test_level_parsing_and_ordering() {
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
        assert!(LogLevel::Error < LogLevel::Debug);
    }
}
