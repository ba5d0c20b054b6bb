//! Process lifecycle helpers used by the server binary.

pub mod shutdown;

// Re-export public API
pub use shutdown::{shutdown_gracefully, watch_for_signals};
