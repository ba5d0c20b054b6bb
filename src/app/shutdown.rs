//! Graceful shutdown handling.

use tokio_util::sync::CancellationToken;

use crate::error_handling::{print_check_statistics, CheckStats};
use crate::export::SinkTask;

/// Cancels `shutdown` on Ctrl-C or SIGTERM.
///
/// Returns early, without cancelling anything new, if `shutdown` is
/// cancelled by someone else first.
pub async fn watch_for_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl-C, shutting down"),
        _ = terminate => log::info!("Received SIGTERM, shutting down"),
        _ = shutdown.cancelled() => return,
    }
    shutdown.cancel();
}

/// Drains the output queue and prints final statistics.
///
/// Call after the HTTP server has stopped so no new records arrive.
pub async fn shutdown_gracefully(sink_task: SinkTask, stats: &CheckStats) {
    sink_task.shutdown().await;
    print_check_statistics(stats);
}
