//! Configuration data model and validation

use crate::cli::Cli;
use crate::types::{Result, SpeedTestError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of tests to run in this invocation
    #[serde(default = "default_number")]
    pub number: u32,

    /// Pause between consecutive tests, in seconds
    #[serde(default = "default_delay_secs")]
    pub delay_seconds: u64,

    /// CSV output path for result rows
    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// Optional path to a JSON server catalog
    #[serde(default)]
    pub servers_path: Option<String>,

    /// Parallel transfer streams per measurement phase
    #[serde(default = "default_streams")]
    pub streams: usize,

    /// Budget for each measurement phase, in seconds
    #[serde(default = "default_phase_timeout_secs")]
    pub phase_timeout_seconds: u64,

    /// Transfer time discarded before sampling starts, in seconds
    #[serde(default = "default_warmup_secs")]
    pub warmup_seconds: u64,

    /// Length of the stable sampling window, in seconds
    #[serde(default = "default_window_secs")]
    pub window_seconds: u64,

    /// Requests in the final latency burst
    #[serde(default = "default_ping_count")]
    pub ping_count: u32,

    /// Simultaneous latency probes during server selection
    #[serde(default = "default_ping_concurrency")]
    pub ping_concurrency: usize,

    /// Size of each generated upload chunk, in bytes
    #[serde(default = "default_upload_chunk_bytes")]
    pub upload_chunk_bytes: usize,

    /// Append results to the CSV sink
    #[serde(default = "default_write_csv")]
    pub write_csv: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,

    /// Prefix log lines with wall-clock timestamps
    #[serde(default)]
    pub show_timestamps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            number: default_number(),
            delay_seconds: default_delay_secs(),
            output_path: default_output_path(),
            servers_path: None,
            streams: default_streams(),
            phase_timeout_seconds: default_phase_timeout_secs(),
            warmup_seconds: default_warmup_secs(),
            window_seconds: default_window_secs(),
            ping_count: default_ping_count(),
            ping_concurrency: default_ping_concurrency(),
            upload_chunk_bytes: default_upload_chunk_bytes(),
            write_csv: default_write_csv(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
            show_timestamps: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the inter-test delay as Duration
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }

    /// Get the per-phase budget as Duration
    pub fn phase_timeout(&self) -> Duration {
        Duration::from_secs(self.phase_timeout_seconds)
    }

    /// Get the warm-up period as Duration
    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_seconds)
    }

    /// Get the stable sampling window as Duration
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    /// Stream count actually used, capped by available cores.
    ///
    /// Small machines get the configured count clamped to twice the logical
    /// core count, with a floor of four so the default stays intact.
    pub fn effective_streams(&self) -> usize {
        let ceiling = (num_cpus::get() * 2).max(4);
        self.streams.min(ceiling).max(1)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.number == 0 {
            return Err(SpeedTestError::config("Test count must be at least 1"));
        }

        if self.number > 100 {
            return Err(SpeedTestError::config("Test count cannot exceed 100"));
        }

        if self.delay_seconds > 3600 {
            return Err(SpeedTestError::config(
                "Inter-test delay cannot exceed 3600 seconds",
            ));
        }

        if self.streams == 0 || self.streams > 16 {
            return Err(SpeedTestError::config(
                "Stream count must be between 1 and 16",
            ));
        }

        if self.phase_timeout_seconds == 0 {
            return Err(SpeedTestError::config("Phase timeout must be greater than 0"));
        }

        if self.phase_timeout_seconds > 300 {
            return Err(SpeedTestError::config(
                "Phase timeout cannot exceed 300 seconds",
            ));
        }

        if self.window_seconds == 0 {
            return Err(SpeedTestError::config(
                "Measurement window must be at least 1 second",
            ));
        }

        if self.warmup_seconds + self.window_seconds > self.phase_timeout_seconds {
            return Err(SpeedTestError::config(format!(
                "Warm-up plus measurement window ({}s) cannot exceed the phase timeout ({}s)",
                self.warmup_seconds + self.window_seconds,
                self.phase_timeout_seconds
            )));
        }

        if self.ping_count == 0 || self.ping_count > 20 {
            return Err(SpeedTestError::config(
                "Ping count must be between 1 and 20",
            ));
        }

        if self.ping_concurrency == 0 || self.ping_concurrency > 16 {
            return Err(SpeedTestError::config(
                "Ping concurrency must be between 1 and 16",
            ));
        }

        if self.upload_chunk_bytes < 1024 || self.upload_chunk_bytes > 8 * 1024 * 1024 {
            return Err(SpeedTestError::config(
                "Upload chunk size must be between 1 KiB and 8 MiB",
            ));
        }

        if self.write_csv && self.output_path.is_empty() {
            return Err(SpeedTestError::config("Output path cannot be empty"));
        }

        if let Some(ref path) = self.servers_path {
            if path.is_empty() {
                return Err(SpeedTestError::config("Server catalog path cannot be empty"));
            }
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(number) = std::env::var("SPEEDTEST_NUMBER") {
            self.number = number.parse().map_err(|e| {
                SpeedTestError::config(format!("Invalid SPEEDTEST_NUMBER value '{}': {}", number, e))
            })?;
        }

        if let Ok(delay) = std::env::var("SPEEDTEST_DELAY") {
            self.delay_seconds = delay.parse().map_err(|e| {
                SpeedTestError::config(format!("Invalid SPEEDTEST_DELAY value '{}': {}", delay, e))
            })?;
        }

        if let Ok(output) = std::env::var("SPEEDTEST_OUTPUT") {
            if !output.trim().is_empty() {
                self.output_path = output.trim().to_string();
            }
        }

        if let Ok(servers) = std::env::var("SPEEDTEST_SERVERS") {
            if !servers.trim().is_empty() {
                self.servers_path = Some(servers.trim().to_string());
            }
        }

        if let Ok(streams) = std::env::var("SPEEDTEST_STREAMS") {
            self.streams = streams.parse().map_err(|e| {
                SpeedTestError::config(format!("Invalid SPEEDTEST_STREAMS value '{}': {}", streams, e))
            })?;
        }

        if let Ok(timeout) = std::env::var("SPEEDTEST_PHASE_TIMEOUT") {
            self.phase_timeout_seconds = timeout.parse().map_err(|e| {
                SpeedTestError::config(format!(
                    "Invalid SPEEDTEST_PHASE_TIMEOUT value '{}': {}",
                    timeout, e
                ))
            })?;
        }

        if let Ok(warmup) = std::env::var("SPEEDTEST_WARMUP") {
            self.warmup_seconds = warmup.parse().map_err(|e| {
                SpeedTestError::config(format!("Invalid SPEEDTEST_WARMUP value '{}': {}", warmup, e))
            })?;
        }

        if let Ok(window) = std::env::var("SPEEDTEST_WINDOW") {
            self.window_seconds = window.parse().map_err(|e| {
                SpeedTestError::config(format!("Invalid SPEEDTEST_WINDOW value '{}': {}", window, e))
            })?;
        }

        if let Ok(enable_color) = std::env::var("SPEEDTEST_ENABLE_COLOR") {
            self.enable_color = enable_color.parse().map_err(|e| {
                SpeedTestError::config(format!(
                    "Invalid SPEEDTEST_ENABLE_COLOR value '{}': {}",
                    enable_color, e
                ))
            })?;
        }

        Ok(())
    }

    /// Build the effective configuration from parsed CLI arguments.
    ///
    /// Defaults are overlaid by `SPEEDTEST_*` environment variables, then by
    /// CLI flags, and the result is validated. A flag left at its built-in
    /// default does not override an environment value. Color resolves here
    /// once: explicit flag, then `SPEEDTEST_ENABLE_COLOR`, then terminal
    /// detection.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = Config::default();
        config.merge_from_env()?;

        if cli.number != crate::defaults::DEFAULT_TEST_NUMBER {
            config.number = cli.number;
        }

        if cli.delay != crate::defaults::DEFAULT_TEST_DELAY.as_secs() {
            config.delay_seconds = cli.delay;
        }

        if cli.output != crate::defaults::DEFAULT_OUTPUT_PATH {
            config.output_path = cli.output.clone();
        }

        if let Some(ref servers) = cli.servers {
            config.servers_path = Some(servers.clone());
        }

        if cli.streams != crate::defaults::DEFAULT_STREAM_COUNT {
            config.streams = cli.streams;
        }

        if cli.phase_timeout != crate::defaults::DEFAULT_PHASE_TIMEOUT.as_secs() {
            config.phase_timeout_seconds = cli.phase_timeout;
        }

        if cli.no_csv {
            config.write_csv = false;
        }

        if cli.no_color {
            config.enable_color = false;
        } else if cli.color {
            config.enable_color = true;
        } else if std::env::var("SPEEDTEST_ENABLE_COLOR").is_err() {
            config.enable_color = cli.use_colors();
        }

        // CLI-only flags
        config.verbose = cli.verbose || cli.debug;
        config.debug = cli.debug;
        config.show_timestamps = cli.timestamps;

        config.validate()?;

        Ok(config)
    }
}

// Default value functions for serde
fn default_number() -> u32 {
    crate::defaults::DEFAULT_TEST_NUMBER
}

fn default_delay_secs() -> u64 {
    crate::defaults::DEFAULT_TEST_DELAY.as_secs()
}

fn default_output_path() -> String {
    crate::defaults::DEFAULT_OUTPUT_PATH.to_string()
}

fn default_streams() -> usize {
    crate::defaults::DEFAULT_STREAM_COUNT
}

fn default_phase_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_PHASE_TIMEOUT.as_secs()
}

fn default_warmup_secs() -> u64 {
    crate::defaults::DEFAULT_WARMUP.as_secs()
}

fn default_window_secs() -> u64 {
    crate::defaults::DEFAULT_WINDOW.as_secs()
}

fn default_ping_count() -> u32 {
    crate::defaults::DEFAULT_PING_COUNT
}

fn default_ping_concurrency() -> usize {
    crate::defaults::DEFAULT_PING_CONCURRENCY
}

fn default_upload_chunk_bytes() -> usize {
    crate::defaults::DEFAULT_UPLOAD_CHUNK_BYTES
}

fn default_write_csv() -> bool {
    true
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests that touch SPEEDTEST_* variables share the process environment
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_number_invalid() {
        let mut config = Config::default();
        config.number = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_excessive_number_invalid() {
        let mut config = Config::default();
        config.number = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stream_bounds() {
        let mut config = Config::default();
        config.streams = 0;
        assert!(config.validate().is_err());

        config.streams = 17;
        assert!(config.validate().is_err());

        config.streams = 16;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_must_fit_phase_timeout() {
        let mut config = Config::default();
        config.warmup_seconds = 10;
        config.window_seconds = 25;
        config.phase_timeout_seconds = 30;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("phase timeout"));

        config.warmup_seconds = 2;
        config.window_seconds = 8;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_window_invalid() {
        let mut config = Config::default();
        config.window_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_output_path_invalid() {
        let mut config = Config::default();
        config.output_path = String::new();
        assert!(config.validate().is_err());

        // Acceptable once CSV output is disabled
        config.write_csv = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_upload_chunk_bounds() {
        let mut config = Config::default();
        config.upload_chunk_bytes = 512;
        assert!(config.validate().is_err());

        config.upload_chunk_bytes = 16 * 1024 * 1024;
        assert!(config.validate().is_err());

        config.upload_chunk_bytes = 64 * 1024;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_effective_streams_has_floor_of_one() {
        let mut config = Config::default();
        config.streams = 1;
        assert_eq!(config.effective_streams(), 1);
    }

    #[test]
    fn test_effective_streams_never_exceeds_configured() {
        let mut config = Config::default();
        config.streams = 2;
        assert!(config.effective_streams() <= 2);
    }

    #[test]
    fn test_duration_accessors() {
        let config = Config::default();
        assert_eq!(config.delay(), Duration::from_secs(config.delay_seconds));
        assert_eq!(
            config.phase_timeout(),
            Duration::from_secs(config.phase_timeout_seconds)
        );
        assert_eq!(config.warmup(), Duration::from_secs(config.warmup_seconds));
        assert_eq!(config.window(), Duration::from_secs(config.window_seconds));
    }

    #[test]
    fn test_merge_from_env_parses_values() {
        let _guard = ENV_MUTEX.lock().unwrap();

        std::env::set_var("SPEEDTEST_NUMBER", "3");
        std::env::set_var("SPEEDTEST_STREAMS", "8");
        std::env::set_var("SPEEDTEST_WARMUP", "1");

        let mut config = Config::default();
        config.merge_from_env().unwrap();
        assert_eq!(config.number, 3);
        assert_eq!(config.streams, 8);
        assert_eq!(config.warmup_seconds, 1);

        std::env::remove_var("SPEEDTEST_NUMBER");
        std::env::remove_var("SPEEDTEST_STREAMS");
        std::env::remove_var("SPEEDTEST_WARMUP");
    }

    #[test]
    fn test_merge_from_env_rejects_garbage() {
        let _guard = ENV_MUTEX.lock().unwrap();

        std::env::set_var("SPEEDTEST_PHASE_TIMEOUT", "soon");
        let mut config = Config::default();
        let result = config.merge_from_env();
        std::env::remove_var("SPEEDTEST_PHASE_TIMEOUT");

        let err = result.unwrap_err();
        assert_eq!(err.category(), "CONFIG");
        assert!(err.to_string().contains("SPEEDTEST_PHASE_TIMEOUT"));
    }

    #[test]
    fn test_serde_defaults_fill_missing_fields() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.number, crate::defaults::DEFAULT_TEST_NUMBER);
        assert_eq!(config.streams, crate::defaults::DEFAULT_STREAM_COUNT);
        assert!(config.write_csv);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_cli_defaults() {
        use clap::Parser;
        let _guard = ENV_MUTEX.lock().unwrap();

        let cli = Cli::parse_from(["ist"]);
        let config = Config::from_cli(&cli).unwrap();
        assert_eq!(config.number, crate::defaults::DEFAULT_TEST_NUMBER);
        assert_eq!(config.output_path, crate::defaults::DEFAULT_OUTPUT_PATH);
        assert!(config.write_csv);
        assert!(!config.verbose);
        assert!(!config.show_timestamps);
    }

    #[test]
    fn test_from_cli_overrides() {
        use clap::Parser;
        let _guard = ENV_MUTEX.lock().unwrap();

        let cli = Cli::parse_from([
            "ist",
            "--number",
            "4",
            "--streams",
            "2",
            "--output",
            "run.csv",
            "--no-csv",
            "--timestamps",
            "--no-color",
        ]);
        let config = Config::from_cli(&cli).unwrap();
        assert_eq!(config.number, 4);
        assert_eq!(config.streams, 2);
        assert_eq!(config.output_path, "run.csv");
        assert!(!config.write_csv);
        assert!(config.show_timestamps);
        assert!(!config.enable_color);
    }

    #[test]
    fn test_from_cli_color_precedence() {
        use clap::Parser;
        let _guard = ENV_MUTEX.lock().unwrap();

        // Bare invocation falls back to terminal detection, which honors
        // NO_COLOR
        std::env::set_var("NO_COLOR", "1");
        let cli = Cli::parse_from(["ist"]);
        let config = Config::from_cli(&cli).unwrap();
        assert!(!config.enable_color);

        // An explicit flag outranks the environment
        let cli = Cli::parse_from(["ist", "--color"]);
        let config = Config::from_cli(&cli).unwrap();
        assert!(config.enable_color);
        std::env::remove_var("NO_COLOR");

        // SPEEDTEST_ENABLE_COLOR outranks detection but not the flags
        std::env::set_var("SPEEDTEST_ENABLE_COLOR", "false");
        let cli = Cli::parse_from(["ist"]);
        let env_only = Config::from_cli(&cli).unwrap();
        let cli = Cli::parse_from(["ist", "--color"]);
        let flag_over_env = Config::from_cli(&cli).unwrap();
        std::env::remove_var("SPEEDTEST_ENABLE_COLOR");

        assert!(!env_only.enable_color);
        assert!(flag_over_env.enable_color);
    }

    #[test]
    fn test_from_cli_debug_implies_verbose() {
        use clap::Parser;
        let _guard = ENV_MUTEX.lock().unwrap();

        let cli = Cli::parse_from(["ist", "--debug"]);
        let config = Config::from_cli(&cli).unwrap();
        assert!(config.debug);
        assert!(config.verbose);
    }

    #[test]
    fn test_from_cli_validates_window_fit() {
        use clap::Parser;
        let _guard = ENV_MUTEX.lock().unwrap();

        // Default warm-up plus window no longer fits a 5 second budget
        let cli = Cli::parse_from(["ist", "--phase-timeout", "5"]);
        let err = Config::from_cli(&cli).unwrap_err();
        assert_eq!(err.category(), "CONFIG");
        assert!(err.to_string().contains("phase timeout"));
    }
}
