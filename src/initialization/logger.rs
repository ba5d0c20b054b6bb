//! Logger initialization.
//!
//! Plain output is colored for terminals; JSON output emits one object per
//! line so logs can share a pipeline with the record stream.

use std::io::{self, Write};

use colored::*;
use env_logger::fmt::Formatter;
use log::{LevelFilter, Record};

use crate::config::{Config, LogFormat};
use crate::error_handling::InitializationError;

/// Initializes the logger from the process configuration.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already set.
pub fn init_logger(config: &Config) -> Result<(), InitializationError> {
    init_logger_with(config.effective_log_level().into(), config.log_format.clone())
}

/// Initializes the logger with the specified level and format.
///
/// `RUST_LOG` is read first so per-module filters keep working, then `level`
/// overrides the global and crate-level filters.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if logger initialization fails.
///
/// # Examples
///
/// ```bash
/// # Use RUST_LOG for quick debugging (no CLI args needed)
/// RUST_LOG=debug weakdh_check
///
/// # Override with CLI args (takes precedence)
/// RUST_LOG=debug weakdh_check --log-level info
///
/// # Per-module filtering via RUST_LOG
/// RUST_LOG=weakdh_check=debug,hickory_resolver=info weakdh_check
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("axum", LevelFilter::Info);
    builder.filter_module("hickory_resolver", LevelFilter::Warn);
    // Malformed or truncated UDP answers are retried by hickory
    builder.filter_module("hickory_proto", LevelFilter::Error);
    builder.filter_module("weakdh_check", level);

    match format {
        LogFormat::Json => {
            builder.format(format_json);
        }
        LogFormat::Plain => {
            colored::control::set_override(true);
            builder.format(format_plain);
        }
    }

    builder.try_init().map_err(InitializationError::from)?;
    Ok(())
}

fn format_json(buf: &mut Formatter, record: &Record<'_>) -> io::Result<()> {
    let line = serde_json::json!({
        "ts": chrono::Utc::now().to_rfc3339(),
        "level": record.level().as_str(),
        "target": record.target(),
        "msg": record.args().to_string(),
    });
    writeln!(buf, "{line}")
}

fn format_plain(buf: &mut Formatter, record: &Record<'_>) -> io::Result<()> {
    let level = record.level();
    let colored_level = match level {
        log::Level::Error => level.to_string().red(),
        log::Level::Warn => level.to_string().yellow(),
        log::Level::Info => level.to_string().green(),
        log::Level::Debug => level.to_string().blue(),
        log::Level::Trace => level.to_string().purple(),
    };
    writeln!(
        buf,
        "{} {} [{}] {}",
        chrono::Local::now().format("%H:%M:%S%.3f").to_string().dimmed(),
        record.target().cyan(),
        colored_level,
        record.args()
    )
}
