//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! a plain text implementation with table formatting capabilities.

use crate::{
    error::{Result, SpeedTestError},
    models::{AggregateStats, MeasurementResult, RunSummary},
};
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Format a status line shown while a test is in progress
    fn format_status(&self, message: &str) -> Result<String>;

    /// Format measurement results as a table, one row per completed test
    fn format_result_table(&self, results: &[MeasurementResult]) -> Result<String>;

    /// Format the end-of-run summary across all scheduled tests
    fn format_run_summary(&self, summary: &RunSummary) -> Result<String>;

    /// Format error messages
    fn format_error(&self, error: &str) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String>;

    /// Format success messages
    fn format_success(&self, message: &str) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Enable verbose mode with detailed information
    pub verbose_mode: bool,
    /// Show table borders
    pub table_borders: bool,
    /// Maximum output width
    pub max_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            table_borders: true,
            max_width: 120,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Show borders around table
    pub show_borders: bool,
    /// Show header row
    pub show_header: bool,
    /// Minimum column width
    pub min_column_width: usize,
    /// Maximum column width
    pub max_column_width: usize,
    /// Cell padding
    pub padding: usize,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    /// Column header
    pub header: String,
    /// Column alignment
    pub alignment: Alignment,
    /// Minimum width
    pub min_width: usize,
    /// Maximum width
    pub max_width: usize,
    /// Whether column is flexible in width
    pub flexible: bool,
}

/// Text alignment options
#[derive(Debug, Clone)]
pub enum Alignment {
    Left,
    Right,
    Center,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// Column layout for the per-test results table
pub(super) fn result_table_format(show_borders: bool) -> TableFormat {
    TableFormat {
        columns: vec![
            Column {
                header: "Timestamp".to_string(),
                alignment: Alignment::Center,
                min_width: 19,
                max_width: 19,
                flexible: false,
            },
            Column {
                header: "Download (Mbps)".to_string(),
                alignment: Alignment::Right,
                min_width: 15,
                max_width: 15,
                flexible: false,
            },
            Column {
                header: "Upload (Mbps)".to_string(),
                alignment: Alignment::Right,
                min_width: 13,
                max_width: 13,
                flexible: false,
            },
            Column {
                header: "Ping (ms)".to_string(),
                alignment: Alignment::Right,
                min_width: 9,
                max_width: 9,
                flexible: false,
            },
        ],
        show_borders,
        show_header: true,
        min_column_width: 8,
        max_column_width: 50,
        padding: 1,
    }
}

/// Row cells for one measurement, presentation-rounded to two decimals
pub(super) fn result_row(result: &MeasurementResult) -> RowData {
    vec![
        result.formatted_timestamp(),
        format!("{:.2}", result.download_mbps),
        format!("{:.2}", result.upload_mbps),
        format!("{:.2}", result.ping_ms),
    ]
}

/// Column layout for the min/mean/max block of the run summary
pub(super) fn summary_table_format(show_borders: bool) -> TableFormat {
    TableFormat {
        columns: vec![
            Column {
                header: "Metric".to_string(),
                alignment: Alignment::Left,
                min_width: 15,
                max_width: 20,
                flexible: true,
            },
            Column {
                header: "Min".to_string(),
                alignment: Alignment::Right,
                min_width: 9,
                max_width: 12,
                flexible: false,
            },
            Column {
                header: "Mean".to_string(),
                alignment: Alignment::Right,
                min_width: 9,
                max_width: 12,
                flexible: false,
            },
            Column {
                header: "Max".to_string(),
                alignment: Alignment::Right,
                min_width: 9,
                max_width: 12,
                flexible: false,
            },
        ],
        show_borders,
        show_header: true,
        min_column_width: 8,
        max_column_width: 50,
        padding: 1,
    }
}

/// Rows for the summary statistics table, one per measured metric
pub(super) fn summary_rows(summary: &RunSummary) -> Vec<RowData> {
    let mut rows = Vec::new();
    let metrics: [(&str, Option<AggregateStats>); 3] = [
        ("Download (Mbps)", summary.download_stats()),
        ("Upload (Mbps)", summary.upload_stats()),
        ("Ping (ms)", summary.ping_stats()),
    ];
    for (label, stats) in metrics {
        if let Some(stats) = stats {
            rows.push(vec![
                label.to_string(),
                format!("{:.2}", stats.min),
                format!("{:.2}", stats.mean),
                format!("{:.2}", stats.max),
            ]);
        }
    }
    rows
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    /// Create a table with the given format and data
    pub(super) fn create_table(&self, format: &TableFormat, rows: &[RowData]) -> Result<String> {
        if rows.is_empty() {
            return Ok(String::new());
        }

        // Calculate column widths
        let column_widths = self.calculate_column_widths(format, rows)?;

        let mut output = String::new();

        // Header
        if format.show_header && !format.columns.is_empty() {
            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&column_widths));
                output.push('\n');
            }

            let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
            output.push_str(&self.create_row(&headers, &column_widths, format));
            output.push('\n');

            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&column_widths));
                output.push('\n');
            }
        }

        // Data rows
        for row in rows {
            output.push_str(&self.create_row(row, &column_widths, format));
            output.push('\n');
        }

        // Bottom border
        if format.show_borders {
            output.push_str(&self.create_horizontal_border(&column_widths));
        }

        Ok(output)
    }

    /// Calculate optimal column widths
    pub(super) fn calculate_column_widths(
        &self,
        format: &TableFormat,
        rows: &[RowData],
    ) -> Result<Vec<usize>> {
        let mut widths = Vec::new();
        let num_columns = format
            .columns
            .len()
            .max(rows.iter().map(|r| r.len()).max().unwrap_or(0));

        for col_idx in 0..num_columns {
            let mut max_width = if col_idx < format.columns.len() {
                format.columns[col_idx]
                    .min_width
                    .max(format.columns[col_idx].header.len())
            } else {
                format.min_column_width
            };

            // Find maximum content width in this column
            for row in rows {
                if col_idx < row.len() {
                    max_width = max_width.max(row[col_idx].len());
                }
            }

            // Apply column constraints
            if col_idx < format.columns.len() {
                let col = &format.columns[col_idx];
                max_width = max_width.min(col.max_width);
            } else {
                max_width = max_width.min(format.max_column_width);
            }

            widths.push(max_width);
        }

        Ok(widths)
    }

    /// Create a table row
    fn create_row(&self, data: &[String], widths: &[usize], format: &TableFormat) -> String {
        let mut row = String::new();

        if format.show_borders {
            row.push('|');
        }

        for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
            let alignment = if idx < format.columns.len() {
                &format.columns[idx].alignment
            } else {
                &Alignment::Left
            };

            let padded_cell = self.align_text(cell, width, alignment);

            if format.show_borders {
                row.push(' ');
            }
            row.push_str(&padded_cell);
            if format.show_borders {
                row.push(' ');
                row.push('|');
            } else {
                row.push_str("  ");
            }
        }

        row.trim_end().to_string()
    }

    /// Create horizontal border for table
    pub(super) fn create_horizontal_border(&self, widths: &[usize]) -> String {
        let mut border = String::new();

        if !widths.is_empty() {
            border.push('+');
            for &width in widths {
                border.push_str(&"-".repeat(width + 2));
                border.push('+');
            }
        }

        border
    }

    /// Align text within specified width
    pub(super) fn align_text(&self, text: &str, width: usize, alignment: &Alignment) -> String {
        if text.len() >= width {
            return text.chars().take(width).collect();
        }

        let padding = width - text.len();
        match alignment {
            Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
            Alignment::Right => format!("{}{}", " ".repeat(padding), text),
            Alignment::Center => {
                let left_pad = padding / 2;
                let right_pad = padding - left_pad;
                format!("{}{}{}", " ".repeat(left_pad), text, " ".repeat(right_pad))
            }
        }
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.len() + 4);

        writeln!(output, "{}", border)
            .map_err(|e| SpeedTestError::io(format!("Failed to format header: {}", e)))?;
        writeln!(output, "  {}  ", title)
            .map_err(|e| SpeedTestError::io(format!("Failed to format header: {}", e)))?;
        write!(output, "{}", border)
            .map_err(|e| SpeedTestError::io(format!("Failed to format header: {}", e)))?;

        Ok(output)
    }

    fn format_status(&self, message: &str) -> Result<String> {
        Ok(message.to_string())
    }

    fn format_result_table(&self, results: &[MeasurementResult]) -> Result<String> {
        if results.is_empty() {
            return Ok("No test results available.".to_string());
        }

        let table_format = result_table_format(self.options.table_borders);
        let rows: Vec<RowData> = results.iter().map(result_row).collect();
        self.create_table(&table_format, &rows)
    }

    fn format_run_summary(&self, summary: &RunSummary) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "Run Summary:")
            .map_err(|e| SpeedTestError::io(format!("Failed to format summary: {}", e)))?;
        writeln!(output, "------------")
            .map_err(|e| SpeedTestError::io(format!("Failed to format summary: {}", e)))?;
        writeln!(output, "Tests Run:   {}", summary.attempted())
            .map_err(|e| SpeedTestError::io(format!("Failed to format summary: {}", e)))?;
        writeln!(output, "Succeeded:   {}", summary.succeeded())
            .map_err(|e| SpeedTestError::io(format!("Failed to format summary: {}", e)))?;
        writeln!(output, "Failed:      {}", summary.failed())
            .map_err(|e| SpeedTestError::io(format!("Failed to format summary: {}", e)))?;

        let rows = summary_rows(summary);
        if rows.is_empty() {
            write!(output, "No successful tests.")
                .map_err(|e| SpeedTestError::io(format!("Failed to format summary: {}", e)))?;
        } else {
            writeln!(output)
                .map_err(|e| SpeedTestError::io(format!("Failed to format summary: {}", e)))?;
            let table = self.create_table(&summary_table_format(self.options.table_borders), &rows)?;
            write!(output, "{}", table)
                .map_err(|e| SpeedTestError::io(format!("Failed to format summary: {}", e)))?;
        }

        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("SUCCESS: {}", message))
    }
}
