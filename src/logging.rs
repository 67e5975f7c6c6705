//! Structured logging for the speed tester
//!
//! Provides leveled, structured log output with per-run session IDs and
//! per-test correlation IDs. Measurement results themselves go to the console
//! through the output module; this logger carries diagnostics, so the default
//! level is quiet and `--verbose`/`--debug` open it up.

use crate::error::{Result, SpeedTestError};
use crate::models::{Config, MeasurementResult, Server};
use crate::types::TestPhase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
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
    /// Fatal level - severe error events that cause application termination
    Fatal = 5,
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
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",    // White
            LogLevel::Debug => "\x1b[36m",    // Cyan
            LogLevel::Info => "\x1b[32m",     // Green
            LogLevel::Warn => "\x1b[33m",     // Yellow
            LogLevel::Error => "\x1b[31m",    // Red
            LogLevel::Fatal => "\x1b[35m",    // Magenta
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = SpeedTestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(SpeedTestError::parse(format!("Invalid log level: {}", s))),
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
    pub fields: HashMap<String, serde_json::Value>,
    /// Thread ID if available
    pub thread_id: Option<String>,
    /// File and line information
    pub location: Option<LogLocation>,
}

/// Source code location information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    /// Source file name
    pub file: String,
    /// Line number
    pub line: u32,
    /// Module path
    pub module: Option<String>,
}

/// Logger implementation with multiple output formats
pub struct Logger {
    /// Minimum log level to output
    min_level: LogLevel,
    /// Whether to use colored output
    use_color: bool,
    /// Whether to prefix console lines with wall-clock timestamps
    include_timestamps: bool,
    /// Whether to include location information
    include_location: bool,
    /// Output format
    format: LogFormat,
    /// Logger name
    name: String,
    /// Shared context storage
    context: Arc<RwLock<LogContext>>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
}

/// Shared logging context for correlation and session tracking
#[derive(Debug, Default)]
struct LogContext {
    /// Global correlation ID for the run
    session_id: Option<String>,
    /// Current operation correlation ID
    current_correlation_id: Option<String>,
    /// Additional context fields
    context_fields: HashMap<String, serde_json::Value>,
}

/// Timing logger for per-test and per-phase durations
pub struct PerformanceLogger {
    logger: Logger,
    start_times: HashMap<String, DateTime<Utc>>,
    operation_stack: Vec<String>,
}

/// Specialized logger for measurement phases and server traffic
pub struct NetworkLogger {
    logger: Logger,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            include_timestamps: true,
            include_location: false,
            format: LogFormat::Console,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger with specific configuration.
    ///
    /// Default is quiet (warnings and up); `--verbose` lowers the threshold
    /// to debug and `--debug` to trace with JSON output and source locations.
    pub fn with_config(name: String, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Trace
        } else if config.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            include_timestamps: config.show_timestamps,
            include_location: config.debug,
            format: if config.debug {
                LogFormat::Json
            } else {
                LogFormat::Console
            },
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Set minimum log level
    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Enable or disable colored output
    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    /// Set session correlation ID
    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    /// Add context field for all subsequent log entries
    pub async fn add_context_field<T: Serialize>(&self, key: String, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            let mut context = self.context.write().await;
            context.context_fields.insert(key, json_value);
        }
    }

    /// Start a correlated operation
    pub async fn start_operation(&self, operation_name: &str) -> String {
        let correlation_id = Uuid::new_v4().to_string();
        {
            let mut context = self.context.write().await;
            context.current_correlation_id = Some(correlation_id.clone());
        }

        self.debug(&format!("Started operation: {}", operation_name))
            .correlation_id(&correlation_id)
            .field("operation", operation_name)
            .field("operation_type", "start")
            .log()
            .await;

        correlation_id
    }

    /// End a correlated operation
    pub async fn end_operation(&self, correlation_id: &str, operation_name: &str, success: bool) {
        self.debug(&format!(
            "Completed operation: {} (success: {})",
            operation_name, success
        ))
        .correlation_id(correlation_id)
        .field("operation", operation_name)
        .field("operation_type", "end")
        .field("success", success)
        .log()
        .await;

        // Clear current correlation ID if it matches
        let mut context = self.context.write().await;
        if context.current_correlation_id.as_deref() == Some(correlation_id) {
            context.current_correlation_id = None;
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    /// Convenience methods for different log levels
    pub fn trace(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Error, message)
    }

    pub fn fatal(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Fatal, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// Write log entry to output
    async fn write_entry(&self, mut entry: LogEntry) {
        // Don't output if below minimum level
        if entry.level < self.min_level {
            return;
        }

        // Add context fields
        let context = self.context.read().await;
        if let Some(session_id) = &context.session_id {
            entry.fields.insert(
                "session_id".to_string(),
                serde_json::Value::String(session_id.clone()),
            );
        }
        if entry.correlation_id.is_none() {
            entry.correlation_id = context.current_correlation_id.clone();
        }

        for (key, value) in &context.context_fields {
            entry.fields.insert(key.clone(), value.clone());
        }
        drop(context);

        // Format and write the entry
        let output = match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
        };

        // Write to stderr for errors/warnings, stdout for others
        if entry.level >= LogLevel::Warn {
            let _ = writeln!(io::stderr(), "{}", output);
        } else {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }

    /// Format log entry for console output
    fn format_console(&self, entry: &LogEntry) -> String {
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!(
                "{}{:>5}{}",
                entry.level.color_code(),
                level_str,
                LogLevel::reset_code()
            )
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = if self.include_timestamps {
            format!(
                "{} {} [{}] {}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                formatted_level,
                entry.logger,
                entry.message
            )
        } else {
            format!("{} [{}] {}", formatted_level, entry.logger, entry.message)
        };

        // Add correlation ID if present
        if let Some(correlation_id) = &entry.correlation_id {
            let short = &correlation_id[..correlation_id.len().min(8)];
            output.push_str(&format!(" [{}]", short));
        }

        // Add fields if any
        if !entry.fields.is_empty() {
            let fields_str: Vec<String> = entry
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            output.push_str(&format!(" {{{}}}", fields_str.join(", ")));
        }

        // Add location if available and enabled
        if self.include_location {
            if let Some(location) = &entry.location {
                output.push_str(&format!(" @ {}:{}", location.file, location.line));
            }
        }

        output
    }

    /// Format log entry as JSON
    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!(
                "{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}",
                entry.message
            ),
        }
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
                fields: HashMap::new(),
                thread_id: std::thread::current().name().map(String::from),
                location: None,
            },
        }
    }

    /// Add a correlation ID
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

    /// Add location information
    pub fn location(mut self, file: &str, line: u32, module: Option<&str>) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
            module: module.map(String::from),
        });
        self
    }

    /// Add the figures of a completed measurement
    pub fn result_info(self, result: &MeasurementResult) -> Self {
        self.field("download_mbps", result.download_mbps)
            .field("upload_mbps", result.upload_mbps)
            .field("ping_ms", result.ping_ms)
            .field("timestamp", result.formatted_timestamp())
    }

    /// Add error information
    pub fn error_info(self, error: &SpeedTestError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

impl PerformanceLogger {
    /// Create a new performance logger
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("PERF".to_string(), config),
            start_times: HashMap::new(),
            operation_stack: Vec::new(),
        }
    }

    /// Start timing an operation
    pub async fn start_timing(&mut self, operation: &str) {
        let start_time = Utc::now();
        self.start_times.insert(operation.to_string(), start_time);
        self.operation_stack.push(operation.to_string());

        self.logger
            .debug(&format!("Started timing: {}", operation))
            .field("operation", operation)
            .field("start_time", start_time)
            .log()
            .await;
    }

    /// End timing an operation and log the duration
    pub async fn end_timing(&mut self, operation: &str) -> Option<chrono::Duration> {
        if let Some(start_time) = self.start_times.remove(operation) {
            let end_time = Utc::now();
            let duration = end_time - start_time;

            // Remove from operation stack
            if let Some(pos) = self.operation_stack.iter().position(|x| x == operation) {
                self.operation_stack.remove(pos);
            }

            self.logger
                .debug(&format!(
                    "Completed timing: {} in {}ms",
                    operation,
                    duration.num_milliseconds()
                ))
                .field("operation", operation)
                .field("start_time", start_time)
                .field("end_time", end_time)
                .field("duration_ms", duration.num_milliseconds())
                .log()
                .await;

            Some(duration)
        } else {
            self.logger
                .warn(&format!(
                    "Attempted to end timing for unknown operation: {}",
                    operation
                ))
                .field("operation", operation)
                .log()
                .await;
            None
        }
    }

    /// Log one finished test with its figures and wall-clock duration
    pub async fn log_test_complete(
        &self,
        test_index: u32,
        duration: Duration,
        result: &MeasurementResult,
    ) {
        self.logger
            .info(&format!(
                "Test {} completed in {:.1}s",
                test_index,
                duration.as_secs_f64()
            ))
            .field("test_index", test_index)
            .field("duration_seconds", duration.as_secs_f64())
            .result_info(result)
            .log()
            .await;
    }

    /// Get currently active operations
    pub fn active_operations(&self) -> &[String] {
        &self.operation_stack
    }
}

impl NetworkLogger {
    /// Create a new network logger
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("NET".to_string(), config),
        }
    }

    /// Log a phase starting
    pub async fn log_phase_start(&self, phase: TestPhase) {
        self.logger
            .debug(&format!("Starting {} phase", phase.name()))
            .field("phase", phase.name())
            .log()
            .await;
    }

    /// Log a phase finishing with its headline figure
    pub async fn log_phase_complete(&self, phase: TestPhase, detail: &str) {
        self.logger
            .debug(&format!("Finished {} phase: {}", phase.name(), detail))
            .field("phase", phase.name())
            .field("detail", detail)
            .log()
            .await;
    }

    /// Log a phase failing
    pub async fn log_phase_failed(&self, phase: TestPhase, error: &SpeedTestError) {
        self.logger
            .warn(&format!("{} phase failed: {}", phase.name(), error))
            .field("phase", phase.name())
            .error_info(error)
            .log()
            .await;
    }

    /// Log the outcome of server selection
    pub async fn log_server_selected(&self, server: &Server, latency: Option<Duration>) {
        let latency_ms = latency.map(|d| d.as_secs_f64() * 1000.0);
        let message = match latency_ms {
            Some(ms) => format!(
                "Selected server {} ({}, {}) at {:.1}ms",
                server.name, server.sponsor, server.country, ms
            ),
            None => format!(
                "Selected server {} ({}, {})",
                server.name, server.sponsor, server.country
            ),
        };

        self.logger
            .debug(&message)
            .field("server_id", server.id)
            .field("server_name", &server.name)
            .field("latency_ms", latency_ms)
            .log()
            .await;
    }
}

/// Global logger factory and management
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    /// Create a new logger factory
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger with a specific name
    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    /// Create a performance logger
    pub fn create_performance_logger(&self) -> PerformanceLogger {
        PerformanceLogger::new(&self.config)
    }

    /// Create a network logger
    pub fn create_network_logger(&self) -> NetworkLogger {
        NetworkLogger::new(&self.config)
    }

    /// Get session ID
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}
