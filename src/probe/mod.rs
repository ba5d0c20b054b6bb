//! TLS probing of resolved addresses.
//!
//! This module provides:
//! - The cipher suite offers of the export, standard DHE and browser probes
//! - The `ProbeEngine` seam behind which the TLS implementation lives
//! - Per-host fan-out with a shared deadline and ordered results

mod ciphers;
mod engine;
mod orchestrator;

// Re-export public API
pub use ciphers::{
    find_by_id, find_by_openssl_name, openssl_cipher_list, CipherSuite, BROWSER_SUITES,
    EXPORT_DHE_SUITES, STANDARD_DHE_SUITES,
};
pub use engine::{HandshakeConfig, HandshakeTranscript, ProbeEngine, ProbeKind, TlsVersion};
pub use orchestrator::{probe_host, probe_hosts, ProbeSettings};
