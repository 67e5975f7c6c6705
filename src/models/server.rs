//! Measurement server catalog and endpoint derivation

use crate::types::{Result, SpeedTestError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// A candidate measurement server from the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    /// Catalog identifier
    pub id: u32,

    /// Display name, usually the city
    pub name: String,

    /// Operator hosting the endpoint
    pub sponsor: String,

    /// Country the endpoint is located in
    pub country: String,

    /// Base URL of the measurement backend
    pub url: String,

    /// Latency measured during selection, unset until pinged
    #[serde(skip)]
    pub latency: Option<Duration>,
}

impl Server {
    /// Create a catalog entry
    pub fn new(id: u32, name: &str, sponsor: &str, country: &str, url: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            sponsor: sponsor.to_string(),
            country: country.to_string(),
            url: url.to_string(),
            latency: None,
        }
    }

    /// Record a measured latency on this entry
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Measured latency in milliseconds, if pinged
    pub fn latency_ms(&self) -> Option<f64> {
        self.latency.map(|d| d.as_secs_f64() * 1000.0)
    }

    /// Human-readable identification for logs and verbose output
    pub fn display_name(&self) -> String {
        format!("{} ({}, {})", self.name, self.sponsor, self.country)
    }

    /// Parse and normalize the base URL.
    ///
    /// The path must end with a slash, otherwise `Url::join` would drop the
    /// final segment when deriving endpoint URLs.
    pub fn base_url(&self) -> Result<Url> {
        let mut base = Url::parse(&self.url)?;

        match base.scheme() {
            "http" | "https" => {}
            other => {
                return Err(SpeedTestError::config(format!(
                    "Server '{}' has unsupported URL scheme '{}'",
                    self.name, other
                )));
            }
        }

        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(base)
    }

    /// Endpoint streaming generated data for download measurement
    pub fn download_url(&self) -> Result<Url> {
        let mut url = self.base_url()?.join("garbage.php")?;
        url.set_query(Some(&format!(
            "ckSize={}",
            crate::defaults::DEFAULT_DOWNLOAD_CHUNKS
        )));
        Ok(url)
    }

    /// Endpoint discarding posted data for upload measurement
    pub fn upload_url(&self) -> Result<Url> {
        Ok(self.base_url()?.join("empty.php")?)
    }

    /// Endpoint answering minimal requests for latency measurement
    pub fn ping_url(&self) -> Result<Url> {
        Ok(self.base_url()?.join("empty.php")?)
    }
}

/// Ordered collection of candidate servers.
///
/// Catalog order is significant: latency ties during selection resolve to the
/// earliest listed entry.
#[derive(Debug, Clone)]
pub struct ServerCatalog {
    servers: Vec<Server>,
}

impl ServerCatalog {
    /// Build the catalog embedded in the binary
    pub fn builtin() -> Self {
        let servers = crate::defaults::DEFAULT_SERVERS
            .iter()
            .map(|&(id, name, sponsor, country, url)| Server::new(id, name, sponsor, country, url))
            .collect();
        Self { servers }
    }

    /// Load a catalog from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SpeedTestError::config(format!(
                "Cannot read server catalog '{}': {}",
                path.display(),
                e
            ))
        })?;

        let servers: Vec<Server> = serde_json::from_str(&raw)?;

        if servers.is_empty() {
            return Err(SpeedTestError::config(format!(
                "Server catalog '{}' contains no servers",
                path.display()
            )));
        }

        Ok(Self { servers })
    }

    /// Candidate servers in catalog order
    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// Consume the catalog, yielding its servers
    pub fn into_servers(self) -> Vec<Server> {
        self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
