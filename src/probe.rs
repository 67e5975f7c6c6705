//! Transport probe: timed HTTP primitives for latency and transfer measurement
//!
//! The probe is the only module that talks to the network. It exposes two
//! operations: a minimal round-trip for latency, and a chunked transfer in
//! either direction that records one throughput sample per chunk until a
//! duration budget elapses. Everything above it (selector, sampler, session)
//! works against the `TransportProbe` trait so tests can substitute fakes.

use crate::{
    error::{Result, SpeedTestError},
    models::{Config, Sample},
    types::TransferDirection,
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Body, Client, Url};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

/// Upper bound on chunks in one upload request body, so a single POST stays
/// within common server body-size limits before the probe issues the next one.
const UPLOAD_CHUNKS_PER_REQUEST: usize = 512;

/// Extra time allowed for the server's response after the last body chunk
const RESPONSE_GRACE: Duration = Duration::from_secs(5);

/// What one stream produced before finishing or dying
#[derive(Debug)]
pub struct StreamOutcome {
    /// Samples recorded before the stream ended
    pub samples: Vec<Sample>,

    /// Set when the stream ended on an error instead of reaching the budget
    pub failure: Option<SpeedTestError>,
}

impl StreamOutcome {
    /// Stream ran its full budget
    pub fn completed(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            failure: None,
        }
    }

    /// Stream died after contributing samples
    pub fn died(samples: Vec<Sample>, error: SpeedTestError) -> Self {
        Self {
            samples,
            failure: Some(error),
        }
    }

    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn total_bytes(&self) -> u64 {
        self.samples.iter().map(|s| s.bytes).sum()
    }
}

/// Timed network primitives used by every measurement phase
#[async_trait]
pub trait TransportProbe: Send + Sync {
    /// Stream chunks in the given direction until the budget elapses,
    /// recording one sample per chunk.
    ///
    /// Returns `Err` when no data moved at all (connect failure, non-success
    /// status, immediate timeout). A stream that dies after contributing
    /// keeps its earlier samples in the outcome, with the failure attached.
    /// `progress` is bumped as payload bytes move so callers can report
    /// transfer progress without touching the samples.
    async fn measure_transfer(
        &self,
        url: &Url,
        direction: TransferDirection,
        budget: Duration,
        progress: Option<Arc<AtomicU64>>,
    ) -> Result<StreamOutcome>;

    /// Round-trip time of a minimal request against the ping endpoint
    async fn measure_latency(&self, url: &Url) -> Result<Duration>;
}

/// `TransportProbe` implementation over a pooled reqwest client
pub struct HttpProbe {
    client: Client,
    ping_timeout: Duration,
    upload_chunk_bytes: usize,
}

impl HttpProbe {
    /// Build a probe from the application configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(crate::defaults::DEFAULT_CONNECT_TIMEOUT)
            .pool_max_idle_per_host(config.effective_streams())
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .build()
            .map_err(|e| {
                SpeedTestError::transport(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            ping_timeout: crate::defaults::DEFAULT_PING_TIMEOUT,
            upload_chunk_bytes: config.upload_chunk_bytes,
        })
    }

    /// Build a probe around an existing client, mainly for tests
    pub fn with_client(client: Client, ping_timeout: Duration, upload_chunk_bytes: usize) -> Self {
        Self {
            client,
            ping_timeout,
            upload_chunk_bytes,
        }
    }

    /// Issue one download request, recording a sample per received chunk.
    /// Returns the number of samples added; the body may end before the
    /// deadline, in which case the caller issues a fresh request.
    async fn run_download_request(
        &self,
        url: &Url,
        phase_start: Instant,
        deadline: Instant,
        samples: &mut Vec<Sample>,
        progress: Option<&Arc<AtomicU64>>,
    ) -> Result<usize> {
        let request_budget = deadline.saturating_duration_since(Instant::now());
        let response = self
            .client
            .get(url.clone())
            .timeout(request_budget + RESPONSE_GRACE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpeedTestError::transport(format!(
                "download endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let mut added = 0;
        let mut stream = response.bytes_stream();
        let mut last = Instant::now();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            match tokio::time::timeout(remaining, stream.next()).await {
                // Budget elapsed while waiting on the socket
                Err(_) => break,
                // Server finished the body; caller decides whether to re-request
                Ok(None) => break,
                Ok(Some(Ok(chunk))) => {
                    let now = Instant::now();
                    let bytes = chunk.len() as u64;
                    samples.push(Sample::new(
                        bytes,
                        now.duration_since(last),
                        now.duration_since(phase_start),
                        TransferDirection::Download,
                    ));
                    if let Some(counter) = progress {
                        counter.fetch_add(bytes, Ordering::Relaxed);
                    }
                    added += 1;
                    last = now;
                }
                Ok(Some(Err(e))) => return Err(e.into()),
            }
        }

        Ok(added)
    }

    /// Issue one upload request whose body is generated chunk by chunk until
    /// the deadline or the per-request chunk cap, whichever comes first.
    /// A sample is recorded when the transport pulls the next chunk, which
    /// is when the previous one has been written out.
    async fn run_upload_request(
        &self,
        url: &Url,
        phase_start: Instant,
        deadline: Instant,
        samples: &mut Vec<Sample>,
        progress: Option<&Arc<AtomicU64>>,
    ) -> Result<usize> {
        let collected: Arc<Mutex<Vec<Sample>>> = Arc::new(Mutex::new(Vec::new()));
        let template = vec![0u8; self.upload_chunk_bytes];
        let chunk_len = template.len() as u64;

        let gen_samples = Arc::clone(&collected);
        let gen_progress = progress.cloned();
        let body_stream = futures::stream::unfold(
            (Instant::now(), 0usize),
            move |(last, sent)| {
                let chunk = template.clone();
                let gen_samples = Arc::clone(&gen_samples);
                let gen_progress = gen_progress.clone();
                async move {
                    if sent >= UPLOAD_CHUNKS_PER_REQUEST || Instant::now() >= deadline {
                        return None;
                    }
                    let now = Instant::now();
                    if sent > 0 {
                        let sample = Sample::new(
                            chunk_len,
                            now.duration_since(last),
                            now.duration_since(phase_start),
                            TransferDirection::Upload,
                        );
                        if let Ok(mut recorded) = gen_samples.lock() {
                            recorded.push(sample);
                        }
                        if let Some(counter) = &gen_progress {
                            counter.fetch_add(chunk_len, Ordering::Relaxed);
                        }
                    }
                    Some((Ok::<Vec<u8>, std::io::Error>(chunk), (now, sent + 1)))
                }
            },
        );

        let request_budget = deadline.saturating_duration_since(Instant::now());
        let response = self
            .client
            .post(url.clone())
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::wrap_stream(body_stream))
            .timeout(request_budget + RESPONSE_GRACE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpeedTestError::transport(format!(
                "upload endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        // Drain the acknowledgement body; its length is irrelevant
        let _ = response.bytes().await;

        let mut added = 0;
        if let Ok(mut recorded) = collected.lock() {
            added = recorded.len();
            samples.append(&mut recorded);
        }
        Ok(added)
    }
}

#[async_trait]
impl TransportProbe for HttpProbe {
    async fn measure_transfer(
        &self,
        url: &Url,
        direction: TransferDirection,
        budget: Duration,
        progress: Option<Arc<AtomicU64>>,
    ) -> Result<StreamOutcome> {
        let phase_start = Instant::now();
        let deadline = phase_start + budget;
        let mut samples: Vec<Sample> = Vec::new();

        while Instant::now() < deadline {
            let attempt = match direction {
                TransferDirection::Download => {
                    self.run_download_request(
                        url,
                        phase_start,
                        deadline,
                        &mut samples,
                        progress.as_ref(),
                    )
                    .await
                }
                TransferDirection::Upload => {
                    self.run_upload_request(
                        url,
                        phase_start,
                        deadline,
                        &mut samples,
                        progress.as_ref(),
                    )
                    .await
                }
            };

            match attempt {
                Ok(added) => {
                    // A download body that ends immediately with no data is a
                    // broken measurement endpoint, not a stall worth retrying
                    // in a tight loop.
                    if added == 0
                        && direction == TransferDirection::Download
                        && Instant::now() < deadline
                    {
                        let error = SpeedTestError::transport(
                            "download endpoint delivered an empty body",
                        );
                        if samples.is_empty() {
                            return Err(error);
                        }
                        return Ok(StreamOutcome::died(samples, error));
                    }
                }
                Err(e) => {
                    if samples.is_empty() {
                        return Err(e);
                    }
                    return Ok(StreamOutcome::died(samples, e));
                }
            }
        }

        Ok(StreamOutcome::completed(samples))
    }

    async fn measure_latency(&self, url: &Url) -> Result<Duration> {
        let start = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .timeout(self.ping_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpeedTestError::transport(format!(
                "ping endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        // Include draining the (tiny) body so the measurement covers the
        // whole exchange.
        response.bytes().await?;

        Ok(start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_probe() -> HttpProbe {
        HttpProbe::with_client(Client::new(), Duration::from_secs(2), 16 * 1024)
    }

    fn endpoint(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    #[tokio::test]
    async fn test_measure_latency_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/empty.php"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = test_probe();
        let latency = probe
            .measure_latency(&endpoint(&server, "/empty.php"))
            .await
            .unwrap();
        assert!(latency > Duration::ZERO);
        assert!(latency < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_measure_latency_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/empty.php"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let probe = test_probe();
        let err = probe
            .measure_latency(&endpoint(&server, "/empty.php"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "TRANSPORT");
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_measure_latency_unreachable_host() {
        // Reserved TEST-NET-1 address, nothing listens there
        let probe = HttpProbe::with_client(
            Client::builder()
                .connect_timeout(Duration::from_millis(300))
                .build()
                .unwrap(),
            Duration::from_millis(500),
            16 * 1024,
        );
        let url = Url::parse("http://192.0.2.1:9/empty.php").unwrap();

        let started = Instant::now();
        let err = probe.measure_latency(&url).await.unwrap_err();
        assert_eq!(err.category(), "TRANSPORT");
        // Bounded by the configured timeout, never hangs
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_download_records_samples() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/garbage.php"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 256 * 1024]))
            .mount(&server)
            .await;

        let probe = test_probe();
        let progress = Arc::new(AtomicU64::new(0));
        let outcome = probe
            .measure_transfer(
                &endpoint(&server, "/garbage.php"),
                TransferDirection::Download,
                Duration::from_millis(600),
                Some(Arc::clone(&progress)),
            )
            .await
            .unwrap();

        assert!(!outcome.samples.is_empty());
        assert!(outcome.total_bytes() > 0);
        assert_eq!(outcome.total_bytes(), progress.load(Ordering::Relaxed));
        for sample in &outcome.samples {
            assert_eq!(sample.direction, TransferDirection::Download);
        }
    }

    #[tokio::test]
    async fn test_download_error_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/garbage.php"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let probe = test_probe();
        let err = probe
            .measure_transfer(
                &endpoint(&server, "/garbage.php"),
                TransferDirection::Download,
                Duration::from_millis(400),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.category(), "TRANSPORT");
    }

    #[tokio::test]
    async fn test_download_empty_body_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/garbage.php"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = test_probe();
        let err = probe
            .measure_transfer(
                &endpoint(&server, "/garbage.php"),
                TransferDirection::Download,
                Duration::from_millis(400),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.category(), "TRANSPORT");
        assert!(err.to_string().contains("empty body"));
    }

    #[tokio::test]
    async fn test_upload_records_samples() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/empty.php"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = test_probe();
        let outcome = probe
            .measure_transfer(
                &endpoint(&server, "/empty.php"),
                TransferDirection::Upload,
                Duration::from_millis(600),
                None,
            )
            .await
            .unwrap();

        assert!(!outcome.failed());
        assert!(!outcome.samples.is_empty());
        for sample in &outcome.samples {
            assert_eq!(sample.direction, TransferDirection::Upload);
            assert_eq!(sample.bytes, 16 * 1024);
        }
    }

    #[tokio::test]
    async fn test_upload_error_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/empty.php"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let probe = test_probe();
        let err = probe
            .measure_transfer(
                &endpoint(&server, "/empty.php"),
                TransferDirection::Upload,
                Duration::from_millis(400),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.category(), "TRANSPORT");
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_stream_outcome_helpers() {
        let samples = vec![Sample::new(
            1024,
            Duration::from_millis(10),
            Duration::from_millis(10),
            TransferDirection::Download,
        )];
        let completed = StreamOutcome::completed(samples.clone());
        assert!(!completed.failed());
        assert_eq!(completed.total_bytes(), 1024);

        let died = StreamOutcome::died(samples, SpeedTestError::transport("gone"));
        assert!(died.failed());
        assert_eq!(died.total_bytes(), 1024);
    }
}
