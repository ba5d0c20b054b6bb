//! Per-request probe fan-out.
//!
//! One task per resolved address, three concurrent probes per task. Every
//! probe of a host shares one absolute deadline, and each host's result lands
//! at the index of its address regardless of which host finishes first.

use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::time::{timeout_at, Instant};

use super::engine::{HandshakeTranscript, ProbeEngine, ProbeKind};
use crate::config::{HOST_DEADLINE, PROBE_PORT, PROBE_TASK_FAILED};
use crate::error_handling::{CheckEvent, CheckStats, ProbeError};
use crate::models::HostResult;

/// Knobs shared by every host task of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// TCP port to probe
    pub port: u16,
    /// Deadline for all work on behalf of one host
    pub host_deadline: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            port: PROBE_PORT,
            host_deadline: HOST_DEADLINE,
        }
    }
}

/// Probes every address concurrently and returns results in address order.
///
/// The returned vector always has exactly `addresses.len()` entries. A host
/// task that panics still fills its slot, with a task failure as its error.
pub async fn probe_hosts<E: ProbeEngine>(
    engine: Arc<E>,
    settings: ProbeSettings,
    server_name: Option<String>,
    addresses: &[IpAddr],
    stats: Arc<CheckStats>,
) -> Vec<HostResult> {
    let mut tasks = FuturesUnordered::new();
    for (index, address) in addresses.iter().copied().enumerate() {
        let handle = tokio::spawn(probe_host(
            Arc::clone(&engine),
            settings,
            server_name.clone(),
            address,
            Arc::clone(&stats),
        ));
        tasks.push(async move { (index, address, handle.await) });
    }

    let mut slots: Vec<Option<HostResult>> = addresses.iter().map(|_| None).collect();
    while let Some((index, address, joined)) = tasks.next().await {
        let result = match joined {
            Ok(result) => result,
            Err(join_error) => {
                log::error!("Probe task for {address} failed: {join_error}");
                HostResult::failed(address, PROBE_TASK_FAILED)
            }
        };
        slots[index] = Some(result);
    }

    slots
        .into_iter()
        .zip(addresses)
        .map(|(slot, address)| {
            slot.unwrap_or_else(|| HostResult::failed(*address, PROBE_TASK_FAILED))
        })
        .collect()
}

/// Runs the export, standard DHE and browser probes against one address.
pub async fn probe_host<E: ProbeEngine>(
    engine: Arc<E>,
    settings: ProbeSettings,
    server_name: Option<String>,
    address: IpAddr,
    stats: Arc<CheckStats>,
) -> HostResult {
    let addr = SocketAddr::new(address, settings.port);
    let deadline = Instant::now() + settings.host_deadline;
    let dial_error: OnceLock<ProbeError> = OnceLock::new();
    let name = server_name.as_deref();

    let (export, standard, browser) = tokio::join!(
        run_probe(&*engine, ProbeKind::Export, addr, name, deadline, &dial_error, &stats),
        run_probe(&*engine, ProbeKind::StandardDhe, addr, name, deadline, &dial_error, &stats),
        run_probe(&*engine, ProbeKind::Browser, addr, name, deadline, &dial_error, &stats),
    );

    let export_dh_params = export.and_then(|t| t.export_dh_params);
    let standard_dh_params = standard.and_then(|t| t.dh_params);

    let (has_tls, negotiated_cipher, browser_dh_params) = match browser {
        Some(t) if t.succeeded() && t.saw_certificate() => (true, t.cipher_suite, t.dh_params),
        _ => {
            stats.increment(CheckEvent::HostWithoutTls);
            (false, None, None)
        }
    };

    if let Some(params) = &export_dh_params {
        stats.increment(CheckEvent::ExportDhObserved);
        log::info!("{addr} accepted an export DHE suite ({} bit group)", params.bits());
    }

    HostResult {
        address,
        has_tls,
        standard_dh_params,
        export_dh_params,
        browser_dh_params,
        negotiated_cipher,
        host_error: dial_error.into_inner().map(|e| e.to_string()),
    }
}

/// One probe: dial, then handshake, both bounded by `deadline`.
///
/// Returns `None` when the connection could not be established. The first
/// such failure across a host's probes is kept in `dial_error`.
async fn run_probe<E: ProbeEngine>(
    engine: &E,
    kind: ProbeKind,
    addr: SocketAddr,
    server_name: Option<&str>,
    deadline: Instant,
    dial_error: &OnceLock<ProbeError>,
    stats: &CheckStats,
) -> Option<HandshakeTranscript> {
    let conn = match timeout_at(deadline, engine.dial(addr)).await {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => {
            record_dial_error(
                dial_error,
                ProbeError::Dial {
                    addr,
                    message: e.to_string(),
                },
                kind,
                stats,
            );
            return None;
        }
        Err(_) => {
            record_dial_error(dial_error, ProbeError::DialTimeout { addr }, kind, stats);
            return None;
        }
    };

    let config = kind.handshake_config(server_name);
    let transcript = match timeout_at(deadline, engine.handshake(conn, &config)).await {
        Ok(transcript) => transcript,
        Err(_) => HandshakeTranscript::failed(
            ProbeError::Handshake {
                addr,
                message: "deadline exceeded".to_string(),
            }
            .to_string(),
        ),
    };

    if let Some(error) = &transcript.error {
        stats.increment(CheckEvent::HandshakeFailed);
        log::debug!("{kind} probe of {addr}: handshake failed: {error}");
    } else {
        log::debug!(
            "{kind} probe of {addr}: negotiated {}",
            transcript.cipher_suite.as_deref().unwrap_or("unknown suite")
        );
    }
    Some(transcript)
}

fn record_dial_error(
    slot: &OnceLock<ProbeError>,
    error: ProbeError,
    kind: ProbeKind,
    stats: &CheckStats,
) {
    stats.increment(CheckEvent::DialFailed);
    log::debug!("{kind} probe: {error}");
    // First failure wins; later ones are only logged.
    let _ = slot.set(error);
}
