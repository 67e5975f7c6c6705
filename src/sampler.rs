//! Parallel-stream bandwidth sampling
//!
//! One `sample` call drives N concurrent transport streams against a server
//! for a warm-up period plus a measurement window, then aggregates the bytes
//! every stream moved inside the window into a single Mbps figure. The
//! warm-up discard keeps TCP slow-start out of the average; the window keeps
//! the figure an average rather than a burst maximum.

use crate::{
    error::{Result, SpeedTestError},
    models::{Config, Sample, Server},
    probe::TransportProbe,
    types::{AbortOnDrop, TransferDirection},
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

/// How often the progress reporter samples the shared byte counter
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Periodic progress notification emitted while a transfer phase runs.
///
/// Events are advisory: they are derived from a shared byte counter on a
/// timer and never feed back into the measurement itself.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub direction: TransferDirection,

    /// Payload bytes moved across all streams since the phase started
    pub total_bytes: u64,

    /// Rate over the most recent reporting interval
    pub instant_mbps: f64,
}

/// Convert a byte count over an elapsed duration to megabits per second
pub fn megabits_per_second(bytes: u64, elapsed: Duration) -> f64 {
    if elapsed.is_zero() {
        return 0.0;
    }
    (bytes as f64 * 8.0) / (elapsed.as_secs_f64() * 1_000_000.0)
}

/// Aggregates concurrent transport streams into one throughput estimate
pub struct BandwidthSampler {
    probe: Arc<dyn TransportProbe>,
}

impl BandwidthSampler {
    pub fn new(probe: Arc<dyn TransportProbe>) -> Self {
        Self { probe }
    }

    /// Measure throughput against `server` in the given direction.
    ///
    /// Runs `config.effective_streams()` parallel streams for the configured
    /// warm-up plus window, discards samples recorded during warm-up, and
    /// averages the rest. A stream dying mid-phase keeps its earlier samples;
    /// only when every stream fails does the phase fail with
    /// `InsufficientSamples`. Progress events go to `progress` while the
    /// phase runs; a dropped receiver stops the reporting, not the
    /// measurement.
    pub async fn sample(
        &self,
        server: &Server,
        direction: TransferDirection,
        config: &Config,
        progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
    ) -> Result<f64> {
        let url = match direction {
            TransferDirection::Download => server.download_url()?,
            TransferDirection::Upload => server.upload_url()?,
        };
        self.measure(
            &url,
            direction,
            config.warmup(),
            config.window(),
            config.effective_streams(),
            progress,
        )
        .await
    }

    async fn measure(
        &self,
        url: &reqwest::Url,
        direction: TransferDirection,
        warmup: Duration,
        window: Duration,
        streams: usize,
        progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
    ) -> Result<f64> {
        let budget = warmup + window;
        let bytes_so_far = Arc::new(AtomicU64::new(0));

        // Guarded tasks die with this future, so a phase timeout or an
        // interrupt dropping us also closes every stream's connection.
        let _reporter = progress.map(|sender| {
            AbortOnDrop(vec![spawn_progress_reporter(
                direction,
                Arc::clone(&bytes_so_far),
                sender,
            )])
        });

        let mut workers = AbortOnDrop(Vec::with_capacity(streams));
        for _ in 0..streams {
            let probe = Arc::clone(&self.probe);
            let url = url.clone();
            let counter = Arc::clone(&bytes_so_far);
            workers.0.push(tokio::spawn(async move {
                probe
                    .measure_transfer(&url, direction, budget, Some(counter))
                    .await
            }));
        }

        let mut joined = Vec::with_capacity(streams);
        for handle in workers.0.iter_mut() {
            joined.push(handle.await);
        }

        let mut samples: Vec<Sample> = Vec::new();
        let mut surviving = 0usize;
        for outcome in joined {
            match outcome {
                Ok(Ok(stream)) => {
                    if !stream.failed() {
                        surviving += 1;
                    }
                    samples.extend(stream.samples);
                }
                // Stream moved no data at all
                Ok(Err(_)) => {}
                // Task panicked or was cancelled; counts as a dead stream
                Err(_) => {}
            }
        }

        if surviving == 0 {
            return Err(SpeedTestError::insufficient_samples(
                direction.name(),
                streams,
            ));
        }

        let mut stable_bytes: u64 = 0;
        let mut last_offset = warmup;
        for sample in &samples {
            if sample.offset >= warmup {
                stable_bytes += sample.bytes;
                if sample.offset > last_offset {
                    last_offset = sample.offset;
                }
            }
        }

        if stable_bytes == 0 {
            return Err(SpeedTestError::insufficient_samples(
                direction.name(),
                streams,
            ));
        }

        // A single chunk landing exactly on the warm-up boundary has no
        // measurable span; fall back to the configured window rather than
        // dividing by zero.
        let span = last_offset.saturating_sub(warmup);
        let elapsed = if span.is_zero() { window } else { span };

        Ok(megabits_per_second(stable_bytes, elapsed))
    }
}

/// Ticks the shared byte counter onto the progress channel until the phase
/// ends or the receiver goes away.
fn spawn_progress_reporter(
    direction: TransferDirection,
    counter: Arc<AtomicU64>,
    sender: mpsc::UnboundedSender<ProgressEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(PROGRESS_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so every event
        // covers a full interval.
        ticker.tick().await;

        let mut previous = 0u64;
        loop {
            ticker.tick().await;
            let total = counter.load(Ordering::Relaxed);
            let delta = total.saturating_sub(previous);
            previous = total;

            let event = ProgressEvent {
                direction,
                total_bytes: total,
                instant_mbps: megabits_per_second(delta, PROGRESS_INTERVAL),
            };
            if sender.send(event).is_err() {
                break;
            }
        }
    })
}
