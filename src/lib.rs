//! weakdh_check library: weak Diffie-Hellman probing over HTTP
//!
//! This library serves `GET /check/?server=<target>`: it resolves the target,
//! runs three concurrent TLS probes against every address (export-grade DHE,
//! full-strength DHE, and a browser-like offer), returns the result as JSON
//! and appends it to a JSON Lines stream.
//!
//! # Example
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use weakdh_check::{run_server, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     listen_address: "127.0.0.1:8080".parse()?,
//!     output_file: "checks.jsonl".into(),
//!     ..Default::default()
//! };
//!
//! let shutdown = CancellationToken::new();
//! let report = run_server(config, shutdown).await?;
//! println!("Served {} checks", report.checks_completed);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod app;
pub mod check;
pub mod config;
pub mod dns;
pub mod error_handling;
pub mod export;
pub mod initialization;
pub mod models;
pub mod probe;
pub mod server;
pub mod target;
pub mod tls;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel, Mode, OverflowPolicy};
pub use run::{run_server, ServerReport};

// Internal run module (wires the server together)
mod run {
    use std::sync::Arc;
    use std::time::Instant;

    use anyhow::{Context, Result};
    use log::info;
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    use crate::app::shutdown_gracefully;
    use crate::check::CheckContext;
    use crate::config::Config;
    use crate::error_handling::{CheckEvent, CheckStats, InitializationError};
    use crate::export::{open_output, OutputSink};
    use crate::initialization::{init_engine, init_resolver};
    use crate::probe::ProbeSettings;
    use crate::server::{serve, AppState};

    /// Summary of a server run, returned once it has shut down.
    #[derive(Debug, Clone)]
    pub struct ServerReport {
        /// Number of `/check` requests that produced a record
        pub checks_completed: usize,
        /// Number of records written to the output
        pub records_written: usize,
        /// Number of records dropped because the output queue was full
        pub records_dropped: usize,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    /// Runs the HTTP server until `shutdown` is cancelled.
    ///
    /// Opens the output destination, prepares the resolver and the TLS
    /// engine, binds `config.listen_address` and serves. On shutdown, in-flight
    /// requests finish, queued records are written, and statistics are logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be opened, the TLS engine cannot
    /// be built, the listener cannot be bound, or the server fails.
    pub async fn run_server(config: Config, shutdown: CancellationToken) -> Result<ServerReport> {
        let start_time = Instant::now();
        let stats = Arc::new(CheckStats::new());

        let writer = open_output(&config.output_file)?;
        let (sink, sink_task) = OutputSink::start(
            writer,
            config.queue_capacity,
            config.output_overflow,
            Arc::clone(&stats),
        );

        let check = CheckContext {
            resolver: init_resolver(),
            engine: init_engine()?,
            settings: ProbeSettings {
                port: config.probe_port,
                host_deadline: config.probe_deadline(),
            },
            stats: Arc::clone(&stats),
        };

        let listener = TcpListener::bind(config.listen_address)
            .await
            .map_err(|source| InitializationError::BindError {
                addr: config.listen_address,
                source,
            })?;

        info!(
            "Probing port {} with a {}s deadline per host, records to {}",
            config.probe_port,
            config.probe_timeout_secs,
            if config.writes_to_stdout() {
                "stdout".to_string()
            } else {
                config.output_file.display().to_string()
            }
        );

        let served = serve(listener, AppState { check, sink }, shutdown.clone())
            .await
            .context("HTTP server failed");

        // Stop the signal watcher too if the server ended on its own.
        shutdown.cancel();
        shutdown_gracefully(sink_task, &stats).await;
        served?;

        Ok(ServerReport {
            checks_completed: stats.get(CheckEvent::CheckCompleted),
            records_written: stats.get(CheckEvent::RecordWritten),
            records_dropped: stats.get(CheckEvent::RecordDropped),
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        })
    }
}
