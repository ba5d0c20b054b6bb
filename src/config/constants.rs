//! Configuration constants.
//!
//! Defaults for the CLI flags and the fixed operational limits of the probe
//! pipeline.

use std::time::Duration;

/// Default socket address the HTTP server binds to.
pub const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1:8080";

/// Output destination meaning "standard output".
pub const STDOUT_DESTINATION: &str = "-";

/// Capacity of the output queue between request handlers and the writer task.
pub const OUTPUT_QUEUE_CAPACITY: usize = 1024;

/// TCP port every probe connects to.
pub const PROBE_PORT: u16 = 443;

/// Absolute deadline shared by the three probes of one host, in seconds.
/// Covers TCP connect and the TLS handshake of every probe connection.
pub const HOST_DEADLINE_SECS: u64 = 10;

/// Convenience form of [`HOST_DEADLINE_SECS`].
pub const HOST_DEADLINE: Duration = Duration::from_secs(HOST_DEADLINE_SECS);

// DNS
/// DNS query timeout in seconds
pub const DNS_TIMEOUT_SECS: u64 = 3;
/// Attempts per DNS query before the resolver gives up
pub const DNS_ATTEMPTS: usize = 2;

/// Request-level error reported when the target does not resolve.
pub const DNS_LOOKUP_FAILED: &str = "DNS lookup failed";

/// Host-level error reported when a host task panics or is aborted.
pub const PROBE_TASK_FAILED: &str = "probe task failed";

/// Longest `server` parameter accepted, matching common URL length limits.
pub const MAX_TARGET_LENGTH: usize = 2048;
