//! Application initialization and resource setup.
//!
//! This module provides functions to initialize all shared resources:
//! - Logger
//! - DNS resolver
//! - TLS probe engine
//!
//! Failures here are fatal at startup and surface as `InitializationError`.

mod logger;
mod resolver;

use std::sync::Arc;

use crate::error_handling::InitializationError;
use crate::tls::OpensslEngine;

// Re-export public API
pub use logger::{init_logger, init_logger_with};
pub use resolver::init_resolver;

/// Initializes the OpenSSL probe engine.
///
/// # Errors
///
/// Returns `InitializationError::TlsEngineError` if OpenSSL cannot build a
/// client context.
pub fn init_engine() -> Result<Arc<OpensslEngine>, InitializationError> {
    Ok(Arc::new(OpensslEngine::new()?))
}
