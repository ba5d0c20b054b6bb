//! Configuration types and CLI options.
//!
//! This module defines the enums and the `Config` struct used for
//! command-line parsing. The parsed `Config` is built once in `main` and
//! passed by reference to whatever needs it.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::constants::{
    DEFAULT_LISTEN_ADDRESS, HOST_DEADLINE_SECS, OUTPUT_QUEUE_CAPACITY, PROBE_PORT,
    STDOUT_DESTINATION,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Execution mode of the server.
///
/// Picks the default log verbosity. `--log-level` overrides it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Verbose logging, every probe outcome is logged
    Debug,
    /// Quiet logging for test harnesses
    Test,
    /// Request-level logging only
    Release,
}

impl Mode {
    /// Log level used when `--log-level` is not given.
    pub fn default_log_level(self) -> LogLevel {
        match self {
            Mode::Debug => LogLevel::Debug,
            Mode::Test => LogLevel::Warn,
            Mode::Release => LogLevel::Info,
        }
    }
}

/// What a request handler does when the output queue is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OverflowPolicy {
    /// Wait for the writer to make room
    Block,
    /// Drop the record and report it in the logs and statistics
    Drop,
}

/// Command-line configuration.
///
/// # Examples
///
/// ```bash
/// # Serve on the default address, records to stdout
/// weakdh_check
///
/// # Release mode, records written to a file
/// weakdh_check --mode release --listen-address 0.0.0.0:8080 --output-file checks.jsonl
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "weakdh_check",
    about = "Probes TLS servers for weak Diffie-Hellman parameters over HTTP."
)]
pub struct Config {
    /// ip:port to listen on
    #[arg(long, default_value = DEFAULT_LISTEN_ADDRESS)]
    pub listen_address: SocketAddr,

    /// File to write check records to (`-` for stdout)
    #[arg(long, value_parser, default_value = STDOUT_DESTINATION)]
    pub output_file: PathBuf,

    /// Execution mode: debug|test|release
    #[arg(long, value_enum, default_value_t = Mode::Debug)]
    pub mode: Mode,

    /// Log level: error|warn|info|debug|trace (defaults to the mode's level)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Capacity of the output queue
    #[arg(long, default_value_t = OUTPUT_QUEUE_CAPACITY, value_parser = parse_capacity)]
    pub queue_capacity: usize,

    /// Behavior when the output queue is full: block|drop
    #[arg(long, value_enum, default_value_t = OverflowPolicy::Block)]
    pub output_overflow: OverflowPolicy,

    /// Deadline in seconds shared by all probes of one host
    #[arg(long, default_value_t = HOST_DEADLINE_SECS)]
    pub probe_timeout_secs: u64,

    /// TCP port to probe
    #[arg(long, default_value_t = PROBE_PORT)]
    pub probe_port: u16,
}

/// Parses a queue capacity, rejecting zero.
fn parse_capacity(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("queue capacity must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Config {
    /// Effective log level: explicit `--log-level`, else the mode default.
    pub fn effective_log_level(&self) -> LogLevel {
        self.log_level
            .clone()
            .unwrap_or_else(|| self.mode.default_log_level())
    }

    /// Whether records go to standard output.
    pub fn writes_to_stdout(&self) -> bool {
        self.output_file.as_os_str() == STDOUT_DESTINATION
    }

    pub fn probe_deadline(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8080))),
            output_file: PathBuf::from(STDOUT_DESTINATION),
            mode: Mode::Debug,
            log_level: None,
            log_format: LogFormat::Plain,
            queue_capacity: OUTPUT_QUEUE_CAPACITY,
            output_overflow: OverflowPolicy::Block,
            probe_timeout_secs: HOST_DEADLINE_SECS,
            probe_port: PROBE_PORT,
        }
    }
}
