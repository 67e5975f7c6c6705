//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;

// Re-export commonly used types
pub use crate::error::{Result, SpeedTestError};

/// Direction of a bandwidth transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferDirection {
    /// Read the response body from the server
    Download,
    /// Send a generated payload to the server
    Upload,
}

impl TransferDirection {
    /// Get a human-readable name for this direction
    pub fn name(&self) -> &'static str {
        match self {
            TransferDirection::Download => "download",
            TransferDirection::Upload => "upload",
        }
    }
}

impl std::fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Measurement stages a session passes through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestPhase {
    /// Picking the lowest-latency server from the catalog
    ServerSelection,
    /// Download throughput sampling
    Download,
    /// Upload throughput sampling
    Upload,
    /// Final round-trip latency burst
    Ping,
}

impl TestPhase {
    /// Get a human-readable name for this phase
    pub fn name(&self) -> &'static str {
        match self {
            TestPhase::ServerSelection => "server selection",
            TestPhase::Download => "download",
            TestPhase::Upload => "upload",
            TestPhase::Ping => "ping",
        }
    }
}

impl std::fmt::Display for TestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Throughput classification used for colorized reporting
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedRating {
    /// Comfortable for streaming and large transfers (>= 100 Mbps)
    Fast,
    /// Usable broadband (25-100 Mbps)
    Moderate,
    /// Below typical broadband baselines (< 25 Mbps)
    Slow,
}

impl SpeedRating {
    /// Classify a throughput estimate in Mbps
    pub fn from_mbps(mbps: f64) -> Self {
        if mbps >= 100.0 {
            Self::Fast
        } else if mbps >= 25.0 {
            Self::Moderate
        } else {
            Self::Slow
        }
    }
}

/// Latency classification used for colorized reporting
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatencyRating {
    /// Suitable for interactive use (< 50 ms)
    Good,
    /// Noticeable but workable (50-150 ms)
    Moderate,
    /// Degraded interactivity (> 150 ms)
    Poor,
}

impl LatencyRating {
    /// Classify a round-trip time
    pub fn from_duration(duration: Duration) -> Self {
        let ms = duration.as_secs_f64() * 1000.0;
        if ms < 50.0 {
            Self::Good
        } else if ms <= 150.0 {
            Self::Moderate
        } else {
            Self::Poor
        }
    }
}

/// Aborts its tasks when dropped.
///
/// Spawned measurement tasks belong to the future that spawned them; when a
/// phase timeout or an interrupt drops that future, the guard closes the
/// tasks and the connections they hold.
pub(crate) struct AbortOnDrop<T>(pub(crate) Vec<JoinHandle<T>>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_direction_names() {
        assert_eq!(TransferDirection::Download.name(), "download");
        assert_eq!(TransferDirection::Upload.name(), "upload");
        assert_eq!(format!("{}", TransferDirection::Upload), "upload");
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(TestPhase::ServerSelection.name(), "server selection");
        assert_eq!(TestPhase::Download.name(), "download");
        assert_eq!(TestPhase::Upload.name(), "upload");
        assert_eq!(TestPhase::Ping.name(), "ping");
    }

    #[test]
    fn test_speed_rating_thresholds() {
        assert_eq!(SpeedRating::from_mbps(250.0), SpeedRating::Fast);
        assert_eq!(SpeedRating::from_mbps(100.0), SpeedRating::Fast);
        assert_eq!(SpeedRating::from_mbps(50.0), SpeedRating::Moderate);
        assert_eq!(SpeedRating::from_mbps(10.0), SpeedRating::Slow);
        assert_eq!(SpeedRating::from_mbps(0.0), SpeedRating::Slow);
    }

    #[test]
    fn test_latency_rating_thresholds() {
        assert_eq!(
            LatencyRating::from_duration(Duration::from_millis(20)),
            LatencyRating::Good
        );
        assert_eq!(
            LatencyRating::from_duration(Duration::from_millis(100)),
            LatencyRating::Moderate
        );
        assert_eq!(
            LatencyRating::from_duration(Duration::from_millis(400)),
            LatencyRating::Poor
        );
    }

    #[tokio::test]
    async fn test_abort_on_drop_cancels_tasks() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let guard = AbortOnDrop(vec![tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            flag.store(true, Ordering::SeqCst);
        })]);
        drop(guard);

        // Give the runtime a moment to process the abort
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
