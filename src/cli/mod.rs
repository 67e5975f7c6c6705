//! Command-line interface definition and argument validation

use clap::Parser;

/// Internet Speed Tester - measures download/upload throughput and latency
#[derive(Parser, Debug, Clone)]
#[command(name = "ist")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Number of tests to run
    #[arg(short, long, default_value_t = crate::defaults::DEFAULT_TEST_NUMBER)]
    pub number: u32,

    /// Delay between consecutive tests in seconds
    #[arg(short, long, default_value_t = crate::defaults::DEFAULT_TEST_DELAY.as_secs())]
    pub delay: u64,

    /// CSV output file path
    #[arg(short, long, default_value_t = crate::defaults::DEFAULT_OUTPUT_PATH.to_string())]
    pub output: String,

    /// JSON server catalog path (defaults to the built-in catalog)
    #[arg(long, value_name = "FILE")]
    pub servers: Option<String>,

    /// Parallel transfer streams per phase
    #[arg(long, default_value_t = crate::defaults::DEFAULT_STREAM_COUNT)]
    pub streams: usize,

    /// Per-phase time budget in seconds
    #[arg(long, value_parser = parse_phase_timeout, default_value_t = crate::defaults::DEFAULT_PHASE_TIMEOUT.as_secs())]
    pub phase_timeout: u64,

    /// Skip CSV persistence for this run
    #[arg(long)]
    pub no_csv: bool,

    /// Prefix log lines with wall-clock timestamps
    #[arg(long)]
    pub timestamps: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting color flags
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.number < 1 {
            return Err("--number must be at least 1".to_string());
        }

        if self.streams == 0 || self.streams > 16 {
            return Err("--streams must be between 1 and 16".to_string());
        }

        if self.phase_timeout == 0 {
            return Err("--phase-timeout must be greater than 0".to_string());
        }

        if self.output.is_empty() && !self.no_csv {
            return Err("--output must not be empty unless --no-csv is given".to_string());
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true // Force color output when --color is specified
        } else if self.no_color {
            false // Disable color output when --no-color is specified
        } else {
            supports_color() // Use automatic detection
        }
    }
}

/// Parse the per-phase budget from a seconds string
fn parse_phase_timeout(s: &str) -> Result<u64, String> {
    // Reject strings with leading + sign or other invalid formats
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > 300 {
                Err("Duration cannot exceed 300 seconds".to_string())
            } else {
                Ok(secs)
            }
        })
}

/// Check if the terminal supports color output
pub(crate) fn supports_color() -> bool {
    // Check for common environment variables that indicate color support
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    // Check for NO_COLOR environment variable
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    // Check for FORCE_COLOR environment variable
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    // Default to true on Unix-like systems, false on Windows
    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parsing_defaults() {
        let cli = Cli::parse_from(["ist"]);
        assert_eq!(cli.number, 1);
        assert_eq!(cli.delay, 5);
        assert_eq!(cli.output, "speedtest.csv");
        assert_eq!(cli.streams, 4);
        assert_eq!(cli.phase_timeout, 30);
        assert!(cli.servers.is_none());
        assert!(!cli.no_csv);
        assert!(!cli.timestamps);
        assert!(!cli.verbose);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_parsing_all_options() {
        let cli = Cli::parse_from([
            "ist",
            "--number",
            "3",
            "--delay",
            "10",
            "--output",
            "results.csv",
            "--servers",
            "catalog.json",
            "--streams",
            "8",
            "--phase-timeout",
            "45",
            "--no-csv",
            "--timestamps",
            "--no-color",
            "--verbose",
            "--debug",
        ]);

        assert_eq!(cli.number, 3);
        assert_eq!(cli.delay, 10);
        assert_eq!(cli.output, "results.csv");
        assert_eq!(cli.servers.as_deref(), Some("catalog.json"));
        assert_eq!(cli.streams, 8);
        assert_eq!(cli.phase_timeout, 45);
        assert!(cli.no_csv);
        assert!(cli.timestamps);
        assert!(cli.no_color);
        assert!(cli.verbose);
        assert!(cli.debug);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["ist", "-n", "2", "-d", "1", "-o", "out.csv", "-v"]);
        assert_eq!(cli.number, 2);
        assert_eq!(cli.delay, 1);
        assert_eq!(cli.output, "out.csv");
        assert!(cli.verbose);
    }

    #[test]
    fn test_validate_rejects_zero_number() {
        let cli = Cli::parse_from(["ist", "--number", "0"]);
        let error = cli.validate().unwrap_err();
        assert!(error.contains("--number"));
    }

    #[test]
    fn test_validate_rejects_bad_stream_counts() {
        let zero = Cli::parse_from(["ist", "--streams", "0"]);
        assert!(zero.validate().unwrap_err().contains("--streams"));

        let too_many = Cli::parse_from(["ist", "--streams", "17"]);
        assert!(too_many.validate().unwrap_err().contains("--streams"));

        let max_allowed = Cli::parse_from(["ist", "--streams", "16"]);
        assert!(max_allowed.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_conflicting_color_flags() {
        let cli = Cli::parse_from(["ist", "--color", "--no-color"]);
        let error = cli.validate().unwrap_err();
        assert!(error.contains("--color"));
        assert!(error.contains("--no-color"));
    }

    #[test]
    fn test_phase_timeout_parser_bounds() {
        assert!(parse_phase_timeout("30").is_ok());
        assert!(parse_phase_timeout("300").is_ok());
        assert!(parse_phase_timeout("0").is_err());
        assert!(parse_phase_timeout("301").is_err());
        assert!(parse_phase_timeout("+5").is_err());
        assert!(parse_phase_timeout("0x10").is_err());
        assert!(parse_phase_timeout("abc").is_err());
    }

    #[test]
    fn test_empty_output_needs_no_csv() {
        let cli = Cli::parse_from(["ist", "--output", ""]);
        assert!(cli.validate().unwrap_err().contains("--output"));

        let with_no_csv = Cli::parse_from(["ist", "--output", "", "--no-csv"]);
        assert!(with_no_csv.validate().is_ok());
    }

    #[test]
    fn test_color_flag_resolution() {
        let forced = Cli::parse_from(["ist", "--color"]);
        assert!(forced.use_colors());

        let disabled = Cli::parse_from(["ist", "--no-color"]);
        assert!(!disabled.use_colors());
    }
}
