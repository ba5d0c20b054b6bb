//! HTTP interface.
//!
//! Serves `GET /check/?server=<target>` (also without the trailing slash).
//! Every request is access-logged.

mod handlers;
mod middleware;
mod types;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::dns::AddressResolver;
use crate::probe::ProbeEngine;

pub use handlers::check_handler;
pub use types::{AppState, ErrorResponse};

/// Builds the application router.
pub fn router<R, E>(state: AppState<R, E>) -> Router
where
    R: AddressResolver,
    E: ProbeEngine,
{
    Router::new()
        .route("/check", get(check_handler::<R, E>))
        .route("/check/", get(check_handler::<R, E>))
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .with_state(state)
}

/// Serves requests on `listener` until `shutdown` is cancelled.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve<R, E>(
    listener: TcpListener,
    state: AppState<R, E>,
    shutdown: CancellationToken,
) -> std::io::Result<()>
where
    R: AddressResolver,
    E: ProbeEngine,
{
    if let Ok(addr) = listener.local_addr() {
        log::info!("Listening on http://{addr}/check/");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
