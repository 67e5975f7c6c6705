//! Main application orchestration and execution

use crate::{
    cli::Cli,
    error::{Result, SpeedTestError},
    logging::LoggerFactory,
    models::{Config, MeasurementResult, RunSummary, Server, ServerCatalog},
    output::{CsvSink, OutputFormatterFactory, ProgressPrinter},
    probe::{HttpProbe, TransportProbe},
    session::Session,
    PKG_NAME, VERSION,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Main application struct that coordinates all components
pub struct App {
    config: Config,
    cancel: Arc<AtomicBool>,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: &Cli) -> Result<Self> {
        let config = Config::from_cli(cli)?;
        Ok(Self::with_config(config))
    }

    /// Create an application instance from an already-validated configuration
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancellation flag shared with the signal handler
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run the scheduled tests sequentially.
    ///
    /// A test failing with a network-level error is counted and the run
    /// continues; configuration and I/O errors abort the run, and an
    /// interrupt surfaces as `Interrupted` with the in-flight session
    /// already torn down.
    pub async fn run(&self) -> Result<RunSummary> {
        let factory = LoggerFactory::new(self.config.clone());
        let logger = factory.create_logger("app").await;
        let mut perf = factory.create_performance_logger();

        logger
            .add_context_field("tests_scheduled".to_string(), self.config.number)
            .await;
        logger
            .add_context_field("streams".to_string(), self.config.effective_streams())
            .await;

        // Color was already resolved from the flags and the environment when
        // the config was built
        let use_color = self.config.enable_color;
        let formatter = OutputFormatterFactory::create_formatter(use_color, self.config.verbose);

        println!("{}", formatter.format_header("Internet Speed Test")?);

        if self.config.debug {
            println!("{} v{} (built {})", PKG_NAME, VERSION, env!("BUILD_TIME"));
            println!("Debug mode enabled, session {}", factory.session_id());
            println!();
        }

        let catalog = self.load_catalog()?;
        logger
            .debug(&format!("Loaded {} candidate servers", catalog.len()))
            .field("catalog_source", self.config.servers_path.as_deref().unwrap_or("builtin"))
            .log()
            .await;

        let probe: Arc<dyn TransportProbe> = Arc::new(HttpProbe::new(&self.config)?);
        let sink = if self.config.write_csv {
            Some(CsvSink::new(&self.config.output_path))
        } else {
            None
        };

        let mut summary = RunSummary::new();
        let total = self.config.number;

        for index in 1..=total {
            if self.cancel.load(Ordering::SeqCst) {
                return Err(SpeedTestError::Interrupted);
            }

            let status = if total > 1 {
                format!("[{}/{}] Running download and upload tests...", index, total)
            } else {
                "Running download and upload tests...".to_string()
            };
            println!("{}", formatter.format_status(&status)?);

            // Every diagnostic line this test produces shares one correlation ID
            let operation = format!("test-{}", index);
            let correlation = logger.start_operation(&operation).await;

            perf.start_timing("speed-test").await;
            let started = Instant::now();

            let outcome = self
                .run_session(Arc::clone(&probe), catalog.servers(), use_color)
                .await;

            let elapsed = started.elapsed();
            perf.end_timing("speed-test").await;
            let succeeded = outcome.is_ok();

            match outcome {
                Ok(result) => {
                    perf.log_test_complete(index, elapsed, &result).await;
                    println!("{}", formatter.format_result_table(std::slice::from_ref(&result))?);

                    if let Some(ref sink) = sink {
                        sink.append(&result)?;
                        logger
                            .debug(&format!("Appended row to {}", sink.path().display()))
                            .log()
                            .await;
                    }

                    summary.record_success(&result);
                }
                Err(SpeedTestError::Interrupted) => {
                    return Err(SpeedTestError::Interrupted);
                }
                Err(error) if error.is_recoverable() => {
                    logger
                        .error(&format!("Test {} of {} failed", index, total))
                        .location(file!(), line!(), Some(module_path!()))
                        .error_info(&error)
                        .log()
                        .await;
                    println!("{}", formatter.format_error(&error.user_friendly_message())?);
                    summary.record_failure();

                    if index < total {
                        println!("{}", formatter.format_warning("Continuing with remaining tests")?);
                    }
                }
                Err(error) => return Err(error),
            }

            logger.end_operation(&correlation, &operation, succeeded).await;

            // Pause between consecutive tests, not after the last
            if index < total {
                self.pause_between_tests().await?;
            }
        }

        if total > 1 {
            println!();
            println!("{}", formatter.format_run_summary(&summary)?);
        } else if summary.succeeded() == 1 {
            println!("{}", formatter.format_success("Speed test complete")?);
        }

        Ok(summary)
    }

    /// Run one measurement session, racing it against the interrupt flag.
    ///
    /// Dropping the session future on interrupt aborts its in-flight
    /// transfers; the progress printer drains and exits once the session's
    /// sender side is gone.
    async fn run_session(
        &self,
        probe: Arc<dyn TransportProbe>,
        candidates: &[Server],
        use_color: bool,
    ) -> Result<MeasurementResult> {
        let (progress_sender, printer_task) = if self.config.verbose {
            let (sender, receiver) = mpsc::unbounded_channel();
            let printer = ProgressPrinter::new(use_color);
            (Some(sender), Some(tokio::spawn(printer.run(receiver))))
        } else {
            (None, None)
        };

        let outcome = {
            let mut session = Session::new(probe, self.config.clone(), Arc::clone(&self.cancel));
            if let Some(sender) = progress_sender {
                session = session.with_progress(sender);
            }

            tokio::select! {
                result = session.run(candidates) => result,
                _ = wait_for_interrupt(&self.cancel) => Err(SpeedTestError::Interrupted),
            }
        };

        if let Some(task) = printer_task {
            let _ = task.await;
        }

        outcome
    }

    /// Sleep out the configured inter-test delay, or bail on interrupt
    async fn pause_between_tests(&self) -> Result<()> {
        let delay = self.config.delay();
        if delay.is_zero() {
            return Ok(());
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = wait_for_interrupt(&self.cancel) => Err(SpeedTestError::Interrupted),
        }
    }

    fn load_catalog(&self) -> Result<ServerCatalog> {
        match self.config.servers_path {
            Some(ref path) => ServerCatalog::from_json_file(path),
            None => Ok(ServerCatalog::builtin()),
        }
    }
}

/// Resolves once the shared cancellation flag is raised
async fn wait_for_interrupt(flag: &AtomicBool) {
    let mut ticker = tokio::time::interval(Duration::from_millis(50));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if flag.load(Ordering::SeqCst) {
            return;
        }
    }
}
