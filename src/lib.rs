//! Internet Speed Tester
//!
//! A parallel-stream internet speed measurement tool that tests download and
//! upload bandwidth plus round-trip latency against the closest of a set of
//! configurable measurement servers.

pub mod app;
pub mod cli;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
pub mod probe;
pub mod sampler;
pub mod selector;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SpeedTestError};
pub use models::{Config, MeasurementResult, RunSummary, Sample, Server, ServerCatalog};
pub use probe::{HttpProbe, TransportProbe};
pub use sampler::BandwidthSampler;
pub use selector::ServerSelector;
pub use session::{Session, SessionState};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_TEST_NUMBER: u32 = 1;
    pub const DEFAULT_TEST_DELAY: Duration = Duration::from_secs(5);
    pub const DEFAULT_OUTPUT_PATH: &str = "speedtest.csv";
    pub const DEFAULT_STREAM_COUNT: usize = 4;
    pub const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_WARMUP: Duration = Duration::from_secs(2);
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(8);
    pub const DEFAULT_PING_COUNT: u32 = 8;
    pub const DEFAULT_PING_CONCURRENCY: usize = 4;
    pub const DEFAULT_UPLOAD_CHUNK_BYTES: usize = 64 * 1024;
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    /// Requested payload size for download endpoints, in 1 MiB chunks
    pub const DEFAULT_DOWNLOAD_CHUNKS: u32 = 100;

    /// Built-in server catalog: (id, name, sponsor, country, base URL)
    pub const DEFAULT_SERVERS: &[(u32, &str, &str, &str, &str)] = &[
        (
            1,
            "Frankfurt",
            "Clouvider Ltd",
            "Germany",
            "https://fra.speedtest.clouvider.net/backend/",
        ),
        (
            2,
            "London",
            "Clouvider Ltd",
            "United Kingdom",
            "https://lon.speedtest.clouvider.net/backend/",
        ),
        (
            3,
            "New York",
            "Clouvider Ltd",
            "United States",
            "https://nyc.speedtest.clouvider.net/backend/",
        ),
        (
            4,
            "Los Angeles",
            "Clouvider Ltd",
            "United States",
            "https://la.speedtest.clouvider.net/backend/",
        ),
        (
            5,
            "Singapore",
            "OVH Cloud",
            "Singapore",
            "https://sgp.proof.ovh.net/backend/",
        ),
    ];
}
