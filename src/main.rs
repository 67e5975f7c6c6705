//! Internet Speed Tester - Main CLI Application
//!
//! Measures download and upload bandwidth plus latency against the best
//! reachable measurement server and optionally appends each result to a
//! CSV history file.

use clap::Parser;
use internet_speed_tester::{
    app::App,
    cli::Cli,
    error::{Result, SpeedTestError},
};
use std::sync::atomic::Ordering;
use std::{error::Error, process};

#[tokio::main]
async fn main() {
    // Set up better panic handling
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        eprintln!(
            "Please report this issue at: {}/issues",
            env!("CARGO_PKG_REPOSITORY")
        );
        process::exit(1);
    }));

    // Pick up SPEEDTEST_* overrides from a local .env file, if present
    dotenv::dotenv().ok();

    // Parse command line arguments
    let cli = Cli::parse();

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        eprintln!("Run with --help for usage information");
        process::exit(1);
    }

    // An explicit color flag also overrides the NO_COLOR/terminal detection
    // the colored crate applies on its own at render time
    if cli.color {
        colored::control::set_override(true);
    } else if cli.no_color {
        colored::control::set_override(false);
    }

    // Handle the actual application logic
    if let Err(e) = run_application(cli).await {
        eprintln!("Error: {}", e);

        if let Some(source) = e.source() {
            eprintln!("Caused by: {}", source);
        }

        // Print suggestions for common errors
        print_error_suggestions(&e);

        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    let app = App::new(&cli)?;

    // Ctrl-C flips the shared flag; the run loop notices it between phases
    // and tears down the in-flight session.
    let cancel = app.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let summary = app.run().await?;

    if summary.all_failed() {
        return Err(SpeedTestError::transport(format!(
            "all {} scheduled test(s) failed - check network connectivity",
            summary.attempted()
        )));
    }

    Ok(())
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &SpeedTestError) {
    match error {
        SpeedTestError::Config(_) | SpeedTestError::Parse(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check flag values against --help");
            eprintln!("  - Check SPEEDTEST_* variables and your .env file");
            eprintln!("  - A server catalog must be a JSON array of server objects");
        }
        SpeedTestError::Transport(_) | SpeedTestError::NoServerAvailable { .. } => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check your internet connection");
            eprintln!("  - Verify firewall and proxy settings");
            eprintln!("  - Try a different catalog with --servers");
        }
        SpeedTestError::InsufficientSamples { .. } | SpeedTestError::Timeout { .. } => {
            eprintln!();
            eprintln!("Measurement troubleshooting:");
            eprintln!("  - Increase the budget with --phase-timeout");
            eprintln!("  - Reduce parallelism with --streams");
            eprintln!("  - The server may be overloaded; try again later");
        }
        SpeedTestError::Io(_) => {
            eprintln!();
            eprintln!("File troubleshooting:");
            eprintln!("  - Check permissions on the output path");
            eprintln!("  - Check free disk space");
            eprintln!("  - Point --output at a writable location");
        }
        SpeedTestError::Interrupted => {}
    }
}
