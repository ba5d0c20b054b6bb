//! Access logging.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Logs method, path and query, status and latency of every request.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed = started.elapsed();
    if status.is_server_error() {
        log::warn!("{method} {uri} {} {elapsed:.2?}", status.as_u16());
    } else {
        log::info!("{method} {uri} {} {elapsed:.2?}", status.as_u16());
    }
    response
}
