//! Server selection by lowest round-trip latency

use crate::{
    error::{Result, SpeedTestError},
    models::Server,
    probe::TransportProbe,
    types::AbortOnDrop,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Picks the best measurement server out of a catalog by pinging every
/// candidate with bounded concurrency.
pub struct ServerSelector {
    probe: Arc<dyn TransportProbe>,
    concurrency: usize,
}

impl ServerSelector {
    pub fn new(probe: Arc<dyn TransportProbe>, concurrency: usize) -> Self {
        Self {
            probe,
            concurrency: concurrency.max(1),
        }
    }

    /// Ping every candidate and return the one with the lowest latency.
    ///
    /// Candidates whose ping fails are excluded. Latency ties resolve to the
    /// earliest catalog entry. Fails with `NoServerAvailable` when the list
    /// is empty or nothing responds.
    pub async fn select_best(&self, candidates: &[Server]) -> Result<Server> {
        let attempted = candidates.len();
        if attempted == 0 {
            return Err(SpeedTestError::no_server_available(0));
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        // Guarded so that dropping the selection mid-flight, on a phase
        // timeout or an interrupt, cancels the outstanding pings.
        let mut tasks = AbortOnDrop(Vec::with_capacity(attempted));

        for (index, server) in candidates.iter().cloned().enumerate() {
            let probe = Arc::clone(&self.probe);
            let semaphore = Arc::clone(&semaphore);

            tasks.0.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                let url = server.ping_url().ok()?;
                match probe.measure_latency(&url).await {
                    Ok(latency) => Some((index, server.with_latency(latency))),
                    Err(_) => None,
                }
            }));
        }

        let mut responding = Vec::with_capacity(attempted);
        for task in tasks.0.iter_mut() {
            if let Ok(Some(entry)) = task.await {
                responding.push(entry);
            }
        }

        responding
            .into_iter()
            .min_by_key(|(index, server)| (server.latency.unwrap_or(Duration::MAX), *index))
            .map(|(_, server)| server)
            .ok_or_else(|| SpeedTestError::no_server_available(attempted))
    }
}
