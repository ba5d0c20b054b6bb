//! DNS resolution of check targets.
//!
//! Hostnames go through the platform-configured `hickory-resolver`; literal
//! addresses skip resolution entirely.

mod resolution;

// Re-export public API
pub use resolution::{resolve_target, AddressResolver};
