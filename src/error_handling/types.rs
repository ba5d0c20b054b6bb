//! Error type definitions.
//!
//! This module defines the error enums used along the check pipeline and the
//! statistics keys that count them.

use std::io;
use std::net::SocketAddr;

use log::SetLoggerError;
use strum_macros::{EnumIter as EnumIterMacro, IntoStaticStr};
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error building the TLS probe engine.
    #[error("TLS engine initialization error: {0}")]
    TlsEngineError(#[from] openssl::error::ErrorStack),

    /// Error opening the output destination.
    #[error("Output file initialization error: {0}")]
    OutputFileError(String),

    /// Error binding the HTTP listener.
    #[error("Failed to bind HTTP server to {addr}: {source}")]
    BindError {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Failure to turn a hostname into addresses.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The resolver returned an error.
    #[error("lookup {host}: {message}")]
    Lookup { host: String, message: String },

    /// The resolver answered, but with no addresses.
    #[error("lookup {host}: no such host")]
    NoAddresses { host: String },
}

/// Failure of a single probe connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// TCP connect failed. Retained as the host-level error.
    #[error("dial tcp {addr}: {message}")]
    Dial { addr: SocketAddr, message: String },

    /// TCP connect did not finish before the host deadline.
    #[error("dial tcp {addr}: i/o timeout")]
    DialTimeout { addr: SocketAddr },

    /// The TLS handshake failed or ran past the deadline.
    #[error("handshake with {addr} failed: {message}")]
    Handshake { addr: SocketAddr, message: String },
}

/// Failure to hand a record to the output writer.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The sink has been shut down.
    #[error("output sink is closed")]
    Closed,

    /// The queue was full and the overflow policy is `drop`.
    #[error("output queue is full, record dropped")]
    Full,

    /// Serializing or writing a record failed.
    #[error("failed to write record: {0}")]
    Write(#[from] io::Error),
}

/// Events counted over the lifetime of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CheckEvent {
    /// A `/check` request produced a record
    CheckCompleted,
    /// The target did not resolve
    DnsLookupFailed,
    /// A probe failed to open its TCP connection
    DialFailed,
    /// A probe connected but the handshake failed
    HandshakeFailed,
    /// The browser probe classified a host as not speaking TLS
    HostWithoutTls,
    /// A host advertised export-grade DH parameters
    ExportDhObserved,
    /// A record reached the output destination
    RecordWritten,
    /// A record was dropped because the output queue was full
    RecordDropped,
    /// Writing a record to the output destination failed
    RecordWriteFailed,
}

impl CheckEvent {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for CheckEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
