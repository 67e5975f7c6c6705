//! Measurement session state machine
//!
//! One `Session` owns a single traversal of the measurement pipeline: pick a
//! server, sample download, sample upload, ping, package the result. Phases
//! run strictly in that order, each under the configured phase timeout, and a
//! failure in any phase ends the session with no result at all. Partial
//! figures are never returned.

use crate::{
    error::{Result, SpeedTestError},
    logging::NetworkLogger,
    models::{Config, MeasurementResult, Server},
    probe::TransportProbe,
    sampler::{BandwidthSampler, ProgressEvent},
    selector::ServerSelector,
    types::{TestPhase, TransferDirection},
};
use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Where a session currently is in its traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    SelectingServer,
    MeasuringDownload,
    MeasuringUpload,
    MeasuringPing,
    Complete,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Complete | SessionState::Failed)
    }
}

/// A single end-to-end measurement against the best available server
pub struct Session {
    config: Config,
    selector: ServerSelector,
    sampler: BandwidthSampler,
    probe: Arc<dyn TransportProbe>,
    logger: NetworkLogger,
    cancel: Arc<AtomicBool>,
    progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
    state: SessionState,
    selected: Option<Server>,
}

impl Session {
    /// Build a session over the given transport.
    ///
    /// `cancel` is polled between phases; setting it makes the session stop
    /// with `Interrupted` before starting the next phase.
    pub fn new(probe: Arc<dyn TransportProbe>, config: Config, cancel: Arc<AtomicBool>) -> Self {
        let selector = ServerSelector::new(Arc::clone(&probe), config.ping_concurrency);
        let sampler = BandwidthSampler::new(Arc::clone(&probe));
        let logger = NetworkLogger::new(&config);

        Self {
            config,
            selector,
            sampler,
            probe,
            logger,
            cancel,
            progress: None,
            state: SessionState::Idle,
            selected: None,
        }
    }

    /// Attach a progress channel forwarded to the transfer phases
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Server chosen by the selection phase, once it has run
    pub fn server(&self) -> Option<&Server> {
        self.selected.as_ref()
    }

    /// Run the full measurement pipeline.
    ///
    /// Returns a complete result or the error of the first phase that failed;
    /// figures from phases that succeeded before the failure are discarded.
    pub async fn run(&mut self, candidates: &[Server]) -> Result<MeasurementResult> {
        self.check_cancelled()?;

        self.state = SessionState::SelectingServer;
        self.logger.log_phase_start(TestPhase::ServerSelection).await;
        let server = match self
            .timed(
                TestPhase::ServerSelection,
                self.selector.select_best(candidates),
            )
            .await
        {
            Ok(server) => server,
            Err(error) => return self.fail(TestPhase::ServerSelection, error).await,
        };
        self.logger.log_server_selected(&server, server.latency).await;
        self.selected = Some(server.clone());

        self.check_cancelled()?;

        self.state = SessionState::MeasuringDownload;
        self.logger.log_phase_start(TestPhase::Download).await;
        let download_mbps = match self
            .timed(
                TestPhase::Download,
                self.sampler.sample(
                    &server,
                    TransferDirection::Download,
                    &self.config,
                    self.progress.clone(),
                ),
            )
            .await
        {
            Ok(mbps) => mbps,
            Err(error) => return self.fail(TestPhase::Download, error).await,
        };
        self.logger
            .log_phase_complete(TestPhase::Download, &format!("{:.2} Mbps", download_mbps))
            .await;

        self.check_cancelled()?;

        self.state = SessionState::MeasuringUpload;
        self.logger.log_phase_start(TestPhase::Upload).await;
        let upload_mbps = match self
            .timed(
                TestPhase::Upload,
                self.sampler.sample(
                    &server,
                    TransferDirection::Upload,
                    &self.config,
                    self.progress.clone(),
                ),
            )
            .await
        {
            Ok(mbps) => mbps,
            Err(error) => return self.fail(TestPhase::Upload, error).await,
        };
        self.logger
            .log_phase_complete(TestPhase::Upload, &format!("{:.2} Mbps", upload_mbps))
            .await;

        self.check_cancelled()?;

        self.state = SessionState::MeasuringPing;
        self.logger.log_phase_start(TestPhase::Ping).await;
        let ping_ms = match self.timed(TestPhase::Ping, self.ping_burst(&server)).await {
            Ok(ms) => ms,
            Err(error) => return self.fail(TestPhase::Ping, error).await,
        };
        self.logger
            .log_phase_complete(TestPhase::Ping, &format!("{:.1} ms", ping_ms))
            .await;

        self.state = SessionState::Complete;
        Ok(MeasurementResult::new(download_mbps, upload_mbps, ping_ms))
    }

    /// Sequential burst of pings against the selected server; the reported
    /// latency is the median of the round trips that answered.
    async fn ping_burst(&self, server: &Server) -> Result<f64> {
        let url = server.ping_url()?;
        let mut latencies = Vec::with_capacity(self.config.ping_count as usize);

        for _ in 0..self.config.ping_count {
            // A lost ping inside the burst is tolerable; the median covers it.
            // Anything session-fatal stops the burst where it is.
            match self.probe.measure_latency(&url).await {
                Ok(latency) => latencies.push(latency),
                Err(error) if error.is_session_fatal() => return Err(error),
                Err(_) => {}
            }
        }

        if latencies.is_empty() {
            return Err(SpeedTestError::insufficient_samples(
                TestPhase::Ping.name(),
                self.config.ping_count as usize,
            ));
        }

        Ok(median_latency_ms(latencies))
    }

    /// Wrap a phase future in the configured per-phase timeout
    async fn timed<T>(
        &self,
        phase: TestPhase,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match timeout(self.config.phase_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(SpeedTestError::phase_timeout(
                phase.name(),
                self.config.phase_timeout_seconds,
            )),
        }
    }

    async fn fail<T>(&mut self, phase: TestPhase, error: SpeedTestError) -> Result<T> {
        self.state = SessionState::Failed;
        self.logger.log_phase_failed(phase, &error).await;
        Err(error)
    }

    fn check_cancelled(&mut self) -> Result<()> {
        if self.cancel.load(Ordering::SeqCst) {
            self.state = SessionState::Failed;
            return Err(SpeedTestError::Interrupted);
        }
        Ok(())
    }
}

/// Median of a latency burst in milliseconds; an even count averages the two
/// middle values. Callers ensure the burst is non-empty.
fn median_latency_ms(mut latencies: Vec<Duration>) -> f64 {
    latencies.sort();
    let middle = latencies.len() / 2;
    if latencies.len() % 2 == 1 {
        latencies[middle].as_secs_f64() * 1000.0
    } else {
        let low = latencies[middle - 1].as_secs_f64();
        let high = latencies[middle].as_secs_f64();
        (low + high) * 1000.0 / 2.0
    }
}
