//! Structured logging for the model connectivity tester
//!
//! This module provides:
//! - Structured log entries with levels, fields and correlation IDs
//! - Console, JSON and compact output formats
//! - A scheduler-specific logger for run and probe lifecycle events
//!
//! All output goes to stderr so that stdout stays clean for results.

use crate::error::{AppError, Result};
use crate::models::{Config, ModelTestEntry};
use crate::session::StatusCounts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general application information
    Info = 2,
    /// Warning level - potentially harmful situations
    Warn = 3,
    /// Error level - error events but application can continue
    Error = 4,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    /// Additional structured fields
    pub fields: BTreeMap<String, serde_json::Value>,
    /// File and line information
    pub location: Option<LogLocation>,
}

/// Source code location information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
    pub module: Option<String>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

/// Shared logging context
#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    context_fields: BTreeMap<String, serde_json::Value>,
}

/// Logger with multiple output formats
#[derive(Debug, Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    include_location: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a new logger at `Info`
    pub fn new(name: &str) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            include_location: false,
            format: LogFormat::Console,
            name: name.to_string(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger configured from the application settings
    pub fn with_config(name: &str, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            include_location: config.debug,
            format: if config.debug {
                LogFormat::Json
            } else if config.verbose {
                LogFormat::Compact
            } else {
                LogFormat::Console
            },
            name: name.to_string(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set session correlation ID attached to every entry
    pub fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().unwrap_or_else(PoisonError::into_inner);
        context.session_id = Some(session_id);
    }

    /// Add context field for all subsequent log entries
    pub fn add_context_field<T: Serialize>(&self, key: &str, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            let mut context = self.context.write().unwrap_or_else(PoisonError::into_inner);
            context.context_fields.insert(key.to_string(), json_value);
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    fn write_entry(&self, mut entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }

        {
            let context = self.context.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(session_id) = &context.session_id {
                entry
                    .fields
                    .insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
            }
            for (key, value) in &context.context_fields {
                entry.fields.insert(key.clone(), value.clone());
            }
        }

        eprintln!("{}", self.render(&entry));
    }

    /// Render an entry in the configured format
    pub fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.format_console(entry),
            LogFormat::Json => self.format_json(entry),
            LogFormat::Compact => self.format_compact(entry),
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short: String = correlation_id.chars().take(8).collect();
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let fields_str: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            output.push_str(&format!(" {{{}}}", fields_str.join(", ")));
        }

        if self.include_location {
            if let Some(location) = &entry.location {
                output.push_str(&format!(" @ {}:{}", location.file, location.line));
            }
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!(
                "{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}",
                entry.message
            ),
        }
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!(
            "{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: BTreeMap::new(),
                location: None,
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32, module: Option<&str>) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
            module: module.map(String::from),
        });
        self
    }

    /// Add the fields describing an entry's current state
    pub fn entry_state(self, entry: &ModelTestEntry) -> Self {
        let mut builder = self
            .field("model", &entry.display_name)
            .field("status", entry.status.as_str());
        if entry.is_redirected() {
            builder = builder.field("upstream", &entry.upstream_name);
        }
        if let Some(latency) = entry.latency_ms {
            builder = builder.field("latency_ms", latency);
        }
        if let Some(error) = &entry.error_message {
            builder = builder.field("error", error);
        }
        builder
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
            .field("error_exit_code", error.exit_code())
    }

    /// Build the entry without writing it
    pub fn build(self) -> LogEntry {
        self.entry
    }

    /// Finalize and write the log entry
    pub fn log(self) {
        self.logger.write_entry(self.entry);
    }
}

/// Logger for scheduler run and probe lifecycle events
#[derive(Debug, Clone)]
pub struct SchedulerLogger {
    logger: Logger,
}

impl SchedulerLogger {
    /// Wrap an existing logger
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Logger that only reports warnings and worse
    pub fn quiet() -> Self {
        let mut logger = Logger::new("SCHED");
        logger.set_level(LogLevel::Warn);
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn run_started(&self, session_id: &str, run_id: u64, workers: usize, entries: usize) {
        self.logger
            .info(&format!("Bulk run {} started: {} models, {} workers", run_id, entries, workers))
            .correlation_id(session_id)
            .field("run_id", run_id)
            .field("workers", workers)
            .field("entries", entries)
            .log();
    }

    pub fn start_ignored(&self, session_id: &str, run_id: u64) {
        self.logger
            .debug(&format!("Start ignored: bulk run {} still active", run_id))
            .correlation_id(session_id)
            .field("run_id", run_id)
            .log();
    }

    pub fn probe_started(&self, session_id: &str, entry: &ModelTestEntry, worker: Option<usize>) {
        let mut builder = self
            .logger
            .debug(&format!("Probing {}", entry.display_name))
            .correlation_id(session_id)
            .entry_state(entry);
        if let Some(worker) = worker {
            builder = builder.field("worker", worker);
        }
        builder.log();
    }

    /// Record a resolved probe; failures are expected and logged at `Info`
    pub fn probe_finished(&self, session_id: &str, entry: &ModelTestEntry) {
        let (level, message) = match (&entry.latency_ms, &entry.error_message) {
            (Some(latency), _) => (LogLevel::Debug, format!("{} reachable in {}ms", entry.display_name, latency)),
            (_, Some(error)) => (LogLevel::Info, format!("{} failed: {}", entry.display_name, error)),
            _ => (LogLevel::Debug, format!("{} now {}", entry.display_name, entry.status)),
        };
        self.logger
            .log(level, &message)
            .correlation_id(session_id)
            .entry_state(entry)
            .log();
    }

    /// A probe client returned `Err` for a malformed request
    pub fn probe_rejected(&self, session_id: &str, model: &str, error: &AppError) {
        self.logger
            .warn(&format!("Probe for {} rejected: {}", model, error))
            .correlation_id(session_id)
            .field("model", model)
            .error_info(error)
            .log();
    }

    pub fn worker_cancelled(&self, session_id: &str, worker: usize, dropped: &str) {
        self.logger
            .debug(&format!("Worker {} observed cancellation, leaving {} pending", worker, dropped))
            .correlation_id(session_id)
            .field("worker", worker)
            .field("model", dropped)
            .log();
    }

    pub fn stop_requested(&self, session_id: &str, run_id: u64) {
        self.logger
            .info(&format!("Stop requested for bulk run {}", run_id))
            .correlation_id(session_id)
            .field("run_id", run_id)
            .log();
    }

    pub fn worker_panicked(&self, session_id: &str, run_id: u64, detail: &str) {
        self.logger
            .error(&format!("Worker of bulk run {} panicked: {}", run_id, detail))
            .correlation_id(session_id)
            .field("run_id", run_id)
            .log();
    }

    pub fn sink_panicked(&self, session_id: &str, model: &str, detail: &str) {
        self.logger
            .error(&format!("Update sink panicked for {}: {}", model, detail))
            .correlation_id(session_id)
            .field("model", model)
            .log();
    }

    pub fn run_finished(&self, session_id: &str, run_id: u64, counts: &StatusCounts, elapsed: Duration) {
        self.logger
            .info(&format!(
                "Bulk run {} finished in {:.3}s: {} ok, {} failed, {} pending",
                run_id,
                elapsed.as_secs_f64(),
                counts.success,
                counts.error,
                counts.pending
            ))
            .correlation_id(session_id)
            .field("run_id", run_id)
            .field("counts", counts)
            .field("duration_ms", elapsed.as_millis() as u64)
            .log();
    }
}

/// Creates loggers sharing one process-wide session ID
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger with a specific name
    pub fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name, &self.config);
        logger.set_session_id(self.session_id.clone());
        logger
    }

    pub fn create_scheduler_logger(&self) -> SchedulerLogger {
        SchedulerLogger::new(self.create_logger("SCHED"))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Convenience macros for logging with location information
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
    };
}
