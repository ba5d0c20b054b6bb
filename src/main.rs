//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `weakdh_check` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - Signal-driven shutdown
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;
use tokio_util::sync::CancellationToken;

use weakdh_check::app::watch_for_signals;
use weakdh_check::initialization::init_logger;
use weakdh_check::{run_server, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments into Config
    let config = Config::parse();

    init_logger(&config).context("Failed to initialize logger")?;
    log::debug!("Starting with {config:?}");

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_for_signals(shutdown.clone()));

    match run_server(config, shutdown).await {
        Ok(report) => {
            log::info!(
                "Served {} check{} in {:.1}s ({} written, {} dropped)",
                report.checks_completed,
                if report.checks_completed == 1 { "" } else { "s" },
                report.elapsed_seconds,
                report.records_written,
                report.records_dropped
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("weakdh_check error: {:#}", e);
            process::exit(1);
        }
    }
}
