//! Measurement samples, results, and multi-run aggregation

use crate::types::{LatencyRating, SpeedRating, TransferDirection};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single throughput observation recorded by one stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Payload bytes moved in this observation
    pub bytes: u64,

    /// Wall time those bytes took to move
    pub elapsed: Duration,

    /// Offset of this observation from the start of its phase
    pub offset: Duration,

    /// Direction the sample was taken in
    pub direction: TransferDirection,
}

impl Sample {
    pub fn new(bytes: u64, elapsed: Duration, offset: Duration, direction: TransferDirection) -> Self {
        Self {
            bytes,
            elapsed,
            offset,
            direction,
        }
    }

    /// Instantaneous rate of this observation in bits per second
    pub fn bits_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        (self.bytes as f64 * 8.0) / secs
    }
}

/// Final record of one completed measurement session.
///
/// Only constructed once a session finishes every phase; a failed session
/// produces an error instead, never a partial record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementResult {
    /// Wall-clock completion time
    pub timestamp: DateTime<Local>,

    /// Download throughput in Mbps
    pub download_mbps: f64,

    /// Upload throughput in Mbps
    pub upload_mbps: f64,

    /// Round-trip latency in milliseconds
    pub ping_ms: f64,
}

impl MeasurementResult {
    /// Package a completed session's numbers, stamped now
    pub fn new(download_mbps: f64, upload_mbps: f64, ping_ms: f64) -> Self {
        Self {
            timestamp: Local::now(),
            download_mbps,
            upload_mbps,
            ping_ms,
        }
    }

    /// Timestamp in the fixed column format used by the CSV sink and table
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Classification of the download estimate for colorized output
    pub fn download_rating(&self) -> SpeedRating {
        SpeedRating::from_mbps(self.download_mbps)
    }

    /// Classification of the upload estimate for colorized output
    pub fn upload_rating(&self) -> SpeedRating {
        SpeedRating::from_mbps(self.upload_mbps)
    }

    /// Classification of the latency for colorized output
    pub fn ping_rating(&self) -> LatencyRating {
        LatencyRating::from_duration(Duration::from_secs_f64(self.ping_ms / 1000.0))
    }
}

/// Min/mean/max spread of one metric across a multi-test run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub std_dev: f64,
    pub count: usize,
}

impl AggregateStats {
    /// Compute the spread of a series; None when the series is empty
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let sum: f64 = values.iter().sum();
        let mean = sum / count as f64;
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let variance = if count > 1 {
            values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / count as f64
        } else {
            0.0
        };

        Some(Self {
            min,
            mean,
            max,
            std_dev: variance.sqrt(),
            count,
        })
    }
}

/// Accumulated outcome of a multi-test run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    succeeded: u32,
    failed: u32,
    downloads: Vec<f64>,
    uploads: Vec<f64>,
    pings: Vec<f64>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed test's numbers
    pub fn record_success(&mut self, result: &MeasurementResult) {
        self.succeeded += 1;
        self.downloads.push(result.download_mbps);
        self.uploads.push(result.upload_mbps);
        self.pings.push(result.ping_ms);
    }

    /// Record a test that failed with a session-fatal error
    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn succeeded(&self) -> u32 {
        self.succeeded
    }

    pub fn failed(&self) -> u32 {
        self.failed
    }

    /// Total tests attempted so far
    pub fn attempted(&self) -> u32 {
        self.succeeded + self.failed
    }

    /// True when at least one test ran and none succeeded
    pub fn all_failed(&self) -> bool {
        self.failed > 0 && self.succeeded == 0
    }

    pub fn download_stats(&self) -> Option<AggregateStats> {
        AggregateStats::from_values(&self.downloads)
    }

    pub fn upload_stats(&self) -> Option<AggregateStats> {
        AggregateStats::from_values(&self.uploads)
    }

    pub fn ping_stats(&self) -> Option<AggregateStats> {
        AggregateStats::from_values(&self.pings)
    }
}
