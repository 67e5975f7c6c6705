//! CSV persistence for measurement results
//!
//! Append-only sink matching the `timestamp,download,upload,ping` schema.
//! The header is written exactly once, when the target file does not yet
//! exist. Values are stored at full precision; rounding is console-only.

use crate::{
    error::{Result, SpeedTestError},
    models::MeasurementResult,
};
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Column header row for result files
pub const CSV_HEADER: &str = "timestamp,download,upload,ping";

/// Append-only CSV writer for completed measurements
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Create a sink targeting the given file path
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Target file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one measurement row, creating the file and header on first use
    pub fn append(&self, result: &MeasurementResult) -> Result<()> {
        let needs_header = !self.path.exists();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                SpeedTestError::io(format!(
                    "Failed to open {} for appending: {}",
                    self.path.display(),
                    e
                ))
            })?;

        if needs_header {
            writeln!(file, "{}", CSV_HEADER).map_err(|e| {
                SpeedTestError::io(format!(
                    "Failed to write header to {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        }

        writeln!(
            file,
            "{},{},{},{}",
            result.formatted_timestamp(),
            result.download_mbps,
            result.upload_mbps,
            result.ping_ms
        )
        .map_err(|e| {
            SpeedTestError::io(format!(
                "Failed to write row to {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }
}
