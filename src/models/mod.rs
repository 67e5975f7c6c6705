//! Data models and structures for the internet speed tester

pub mod config;
pub mod result;
pub mod server;

// Re-export main model types
pub use config::Config;
pub use result::{AggregateStats, MeasurementResult, RunSummary, Sample};
pub use server::{Server, ServerCatalog};
