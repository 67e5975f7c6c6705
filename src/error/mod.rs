//! Error handling for the internet speed tester

use thiserror::Error;

/// Custom error types for the internet speed tester
#[derive(Error, Debug)]
pub enum SpeedTestError {
    /// Probe-level transport failures (connect, stream I/O, bad status).
    /// Recoverable: the sampler absorbs these as long as one stream survives.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Every candidate server failed its latency probe
    #[error("No server available: all {attempted} candidate(s) failed to respond")]
    NoServerAvailable { attempted: usize },

    /// Every stream in a measurement phase died before producing usable samples
    #[error("Insufficient samples: all {streams} stream(s) failed during the {phase} phase")]
    InsufficientSamples { phase: String, streams: usize },

    /// A measurement phase exceeded its time budget
    #[error("Timeout error: {phase} phase exceeded its {budget_secs}s budget")]
    Timeout { phase: String, budget_secs: u64 },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parsing errors (URLs, JSON, numbers)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// I/O errors (CSV sink, catalog files)
    #[error("I/O error: {0}")]
    Io(String),

    /// The run was interrupted by the user
    #[error("Interrupted by user")]
    Interrupted,
}

impl SpeedTestError {
    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new no-server-available error
    pub fn no_server_available(attempted: usize) -> Self {
        Self::NoServerAvailable { attempted }
    }

    /// Create a new insufficient-samples error
    pub fn insufficient_samples<S: Into<String>>(phase: S, streams: usize) -> Self {
        Self::InsufficientSamples {
            phase: phase.into(),
            streams,
        }
    }

    /// Create a new phase timeout error
    pub fn phase_timeout<S: Into<String>>(phase: S, budget_secs: u64) -> Self {
        Self::Timeout {
            phase: phase.into(),
            budget_secs,
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT",
            Self::NoServerAvailable { .. } => "SERVER",
            Self::InsufficientSamples { .. } => "SAMPLES",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Config(_) => "CONFIG",
            Self::Parse(_) => "PARSE",
            Self::Io(_) => "IO",
            Self::Interrupted => "INTERRUPT",
        }
    }

    /// Check if error is recoverable (a later attempt may succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(_)
            | Self::NoServerAvailable { .. }
            | Self::InsufficientSamples { .. }
            | Self::Timeout { .. } => true,
            Self::Config(_) | Self::Parse(_) | Self::Io(_) | Self::Interrupted => false,
        }
    }

    /// Check if error aborts the in-progress session.
    ///
    /// Stream-level transport failures are absorbed by the sampler and by the
    /// ping burst; everything else discards the session with no partial
    /// result.
    pub fn is_session_fatal(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Transport(msg) => {
                format!("Transport failure: {}\n\nSuggestion: Check your internet connection and try again.", msg)
            }
            Self::NoServerAvailable { attempted } => {
                format!("No measurement server responded ({} tried).\n\nSuggestion: Check your internet connection, or supply a different catalog with --servers.", attempted)
            }
            Self::InsufficientSamples { phase, streams } => {
                format!("All {} stream(s) failed during the {} phase.\n\nSuggestion: The server may be overloaded. Try again, or lower --streams.", streams, phase)
            }
            Self::Timeout { phase, budget_secs } => {
                format!("The {} phase did not finish within {}s.\n\nSuggestion: Increase --phase-timeout or check for a congested link.", phase, budget_secs)
            }
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your command line arguments or SPEEDTEST_* environment variables.", msg)
            }
            Self::Parse(msg) => {
                format!("Failed to parse data: {}\n\nSuggestion: Check the format of your server catalog or configuration values.", msg)
            }
            Self::Io(msg) => {
                format!("File operation failed: {}\n\nSuggestion: Check file permissions and disk space for the output path.", msg)
            }
            Self::Interrupted => {
                "The run was interrupted before completing.".to_string()
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Parse(_) | Self::Io(_) => 1, // Invalid configuration/usage
            Self::Transport(_)
            | Self::NoServerAvailable { .. }
            | Self::InsufficientSamples { .. }
            | Self::Timeout { .. } => 2, // Network-fatal
            Self::Interrupted => 130, // Conventional SIGINT code
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Parse(_) | Self::Io(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Transport(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Timeout { .. } => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::NoServerAvailable { .. } | Self::InsufficientSamples { .. } => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
                Self::Interrupted => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for SpeedTestError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for SpeedTestError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for SpeedTestError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<reqwest::Error> for SpeedTestError {
    fn from(error: reqwest::Error) -> Self {
        // Probe-level timeouts are transport failures; the Timeout variant is
        // reserved for a phase blowing its overall budget.
        if error.is_timeout() {
            Self::transport(format!("request timed out: {}", error))
        } else if error.is_connect() {
            Self::transport(format!("connection failed: {}", error))
        } else {
            Self::transport(error.to_string())
        }
    }
}

impl From<dotenv::Error> for SpeedTestError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for SpeedTestError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for SpeedTestError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::parse(format!("Float parse error: {}", error))
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, SpeedTestError>;
