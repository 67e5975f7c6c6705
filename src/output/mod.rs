//! Output formatting and display system
//!
//! This module provides a flexible output formatting system for test results,
//! supporting both colored and plain text output with table formatting, plus
//! the CSV sink used for persisted rows.

mod colored;
mod csv;
mod formatter;

pub use colored::{ColorScheme, ColoredFormatter};
pub use csv::{CsvSink, CSV_HEADER};
pub use formatter::{
    Alignment, Column, FormattingOptions, OutputFormatter, PlainFormatter, RowData, TableFormat,
};

use crate::{models::Config, sampler::ProgressEvent};
use tokio::sync::mpsc;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            table_borders: true,
            max_width: 120,
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Create a formatter from the effective configuration
    pub fn from_config(config: &Config) -> Box<dyn OutputFormatter> {
        Self::create_formatter(config.enable_color, config.verbose)
    }
}

/// Console progress reporter fed by the sampler's event channel.
///
/// Runs until the sending side is dropped, printing instantaneous rates
/// for the in-flight transfer phase.
pub struct ProgressPrinter {
    use_color: bool,
}

impl ProgressPrinter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    /// Drain progress events, one status line per tick
    pub async fn run(self, mut receiver: mpsc::UnboundedReceiver<ProgressEvent>) {
        use ::colored::Colorize as _;

        while let Some(event) = receiver.recv().await {
            let line = format!(
                "  {}: {:>8.2} Mbps ({:.1} MB transferred)",
                event.direction.name(),
                event.instant_mbps,
                event.total_bytes as f64 / 1_000_000.0
            );
            if self.use_color {
                println!("{}", line.dimmed());
            } else {
                println!("{}", line);
            }
        }
    }
}
