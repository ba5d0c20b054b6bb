//! Error handling and check statistics.
//!
//! This module provides:
//! - Error type definitions for initialization, resolution, probing and output
//! - Event counters shared across the pipeline
//!
//! Only input validation is ever surfaced as a non-200 response. Everything
//! else is captured into the request record or counted here.

mod stats;
mod types;

// Re-export public API
pub use stats::{print_check_statistics, CheckStats};
pub use types::{CheckEvent, InitializationError, ProbeError, ResolveError, SinkError};
