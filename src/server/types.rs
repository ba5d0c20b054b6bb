//! Server state and response bodies.

use serde::Serialize;

use crate::check::CheckContext;
use crate::export::OutputSink;

/// Shared state of the HTTP handlers.
pub struct AppState<R, E> {
    pub check: CheckContext<R, E>,
    pub sink: OutputSink,
}

impl<R, E> Clone for AppState<R, E> {
    fn clone(&self) -> Self {
        Self {
            check: self.check.clone(),
            sink: self.sink.clone(),
        }
    }
}

/// JSON body of every non-200 response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
