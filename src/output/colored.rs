//! Colored formatter implementation with terminal color support
//!
//! This module provides a rich colored output formatter that uses
//! ANSI colors and Unicode symbols for enhanced visual presentation.

use crate::{
    error::{Result, SpeedTestError},
    models::{MeasurementResult, RunSummary},
    types::{LatencyRating, SpeedRating},
};
use super::formatter::{
    result_row, result_table_format, summary_rows, summary_table_format, FormattingOptions,
    OutputFormatter, PlainFormatter, RowData, TableFormat,
};
use colored::*;
use std::fmt::Write as _;

/// Terminal color for a throughput classification
fn speed_color(rating: SpeedRating) -> Color {
    match rating {
        SpeedRating::Fast => Color::Green,
        SpeedRating::Moderate => Color::Yellow,
        SpeedRating::Slow => Color::Red,
    }
}

/// Terminal color for a latency classification
fn latency_color(rating: LatencyRating) -> Color {
    match rating {
        LatencyRating::Good => Color::Green,
        LatencyRating::Moderate => Color::Yellow,
        LatencyRating::Poor => Color::Red,
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    plain_formatter: PlainFormatter,
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        let plain_formatter = PlainFormatter::new(options.clone());
        Self {
            plain_formatter,
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    /// Create a colored formatter with custom color scheme
    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        let plain_formatter = PlainFormatter::new(options.clone());
        Self {
            plain_formatter,
            options,
            color_scheme,
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    /// Apply bold formatting if colors are enabled
    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    /// Apply dimmed formatting if colors are enabled
    fn dimmed(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.dimmed()
        } else {
            text.normal()
        }
    }

    /// Bold section heading in the scheme's header color
    fn heading(&self, text: &str) -> String {
        if self.options.enable_color {
            text.bold().color(self.color_scheme.header).to_string()
        } else {
            text.to_string()
        }
    }

    /// Render one measurement row with rating-colored throughput cells.
    ///
    /// Cells are aligned before the color codes are applied so the escape
    /// sequences do not distort the column widths.
    fn paint_result_row(
        &self,
        result: &MeasurementResult,
        widths: &[usize],
        format: &TableFormat,
    ) -> String {
        let cells = result_row(result);
        let colors = [
            None,
            Some(speed_color(result.download_rating())),
            Some(speed_color(result.upload_rating())),
            Some(latency_color(result.ping_rating())),
        ];

        let mut row = String::new();
        if format.show_borders {
            row.push('|');
        }

        for (idx, (cell, &width)) in cells.iter().zip(widths.iter()).enumerate() {
            let aligned = self
                .plain_formatter
                .align_text(cell, width, &format.columns[idx].alignment);
            let painted = match colors[idx] {
                Some(color) => self.colorize(&aligned, color).to_string(),
                None => aligned,
            };

            if format.show_borders {
                row.push(' ');
            }
            row.push_str(&painted);
            if format.show_borders {
                row.push(' ');
                row.push('|');
            } else {
                row.push_str("  ");
            }
        }

        row.trim_end().to_string()
    }

    /// Render the header row of a table in bold
    fn paint_header_row(&self, format: &TableFormat, widths: &[usize]) -> String {
        let mut row = String::new();
        if format.show_borders {
            row.push('|');
        }

        for (column, &width) in format.columns.iter().zip(widths.iter()) {
            let aligned = self
                .plain_formatter
                .align_text(&column.header, width, &column.alignment);
            let painted = self.bold(&aligned).to_string();

            if format.show_borders {
                row.push(' ');
            }
            row.push_str(&painted);
            if format.show_borders {
                row.push(' ');
                row.push('|');
            } else {
                row.push_str("  ");
            }
        }

        row.trim_end().to_string()
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();

        let border = "═".repeat(title.len() + 4);

        writeln!(output, "{}", self.colorize(&border, self.color_scheme.border))
            .map_err(|e| SpeedTestError::io(format!("Failed to format header: {}", e)))?;
        writeln!(output, "  {}  ", self.heading(title))
            .map_err(|e| SpeedTestError::io(format!("Failed to format header: {}", e)))?;
        write!(output, "{}", self.colorize(&border, self.color_scheme.border))
            .map_err(|e| SpeedTestError::io(format!("Failed to format header: {}", e)))?;

        Ok(output)
    }

    fn format_status(&self, message: &str) -> Result<String> {
        Ok(self.colorize(message, self.color_scheme.info).to_string())
    }

    fn format_result_table(&self, results: &[MeasurementResult]) -> Result<String> {
        if !self.options.enable_color {
            return self.plain_formatter.format_result_table(results);
        }
        if results.is_empty() {
            return Ok(self.dimmed("No test results available.").to_string());
        }

        let table_format = result_table_format(self.options.table_borders);
        let plain_rows: Vec<RowData> = results.iter().map(result_row).collect();
        let widths = self
            .plain_formatter
            .calculate_column_widths(&table_format, &plain_rows)?;
        let border = self
            .colorize(
                &self.plain_formatter.create_horizontal_border(&widths),
                self.color_scheme.border,
            )
            .to_string();

        let mut output = String::new();
        if table_format.show_borders {
            output.push_str(&border);
            output.push('\n');
        }
        output.push_str(&self.paint_header_row(&table_format, &widths));
        output.push('\n');
        if table_format.show_borders {
            output.push_str(&border);
            output.push('\n');
        }
        for result in results {
            output.push_str(&self.paint_result_row(result, &widths, &table_format));
            output.push('\n');
        }
        if table_format.show_borders {
            output.push_str(&border);
        }

        Ok(output)
    }

    fn format_run_summary(&self, summary: &RunSummary) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "{}", self.heading("Run Summary:"))
            .map_err(|e| SpeedTestError::io(format!("Failed to format summary: {}", e)))?;
        writeln!(output, "Tests Run:   {}", summary.attempted())
            .map_err(|e| SpeedTestError::io(format!("Failed to format summary: {}", e)))?;
        writeln!(
            output,
            "Succeeded:   {}",
            self.colorize(&summary.succeeded().to_string(), self.color_scheme.success)
        )
        .map_err(|e| SpeedTestError::io(format!("Failed to format summary: {}", e)))?;

        let failed_color = if summary.failed() > 0 {
            self.color_scheme.error
        } else {
            self.color_scheme.muted
        };
        writeln!(
            output,
            "Failed:      {}",
            self.colorize(&summary.failed().to_string(), failed_color)
        )
        .map_err(|e| SpeedTestError::io(format!("Failed to format summary: {}", e)))?;

        let rows = summary_rows(summary);
        if rows.is_empty() {
            write!(output, "{}", self.dimmed("No successful tests."))
                .map_err(|e| SpeedTestError::io(format!("Failed to format summary: {}", e)))?;
        } else {
            writeln!(output)
                .map_err(|e| SpeedTestError::io(format!("Failed to format summary: {}", e)))?;
            let table = self
                .plain_formatter
                .create_table(&summary_table_format(self.options.table_borders), &rows)?;
            write!(output, "{}", table)
                .map_err(|e| SpeedTestError::io(format!("Failed to format summary: {}", e)))?;
        }

        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("❌ {}", self.colorize(error, self.color_scheme.error)))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("⚠️  {}", self.colorize(warning, self.color_scheme.warning)))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("✅ {}", self.colorize(message, self.color_scheme.success)))
    }
}
