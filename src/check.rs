//! The `/check` pipeline: normalize, resolve, probe, seal.

use std::sync::Arc;

use crate::config::DNS_LOOKUP_FAILED;
use crate::dns::{resolve_target, AddressResolver};
use crate::error_handling::{CheckEvent, CheckStats};
use crate::models::{CheckParams, RequestRecord};
use crate::probe::{probe_hosts, ProbeEngine, ProbeSettings};
use crate::target::normalize_target;

/// Shared collaborators of every check.
pub struct CheckContext<R, E> {
    pub resolver: Arc<R>,
    pub engine: Arc<E>,
    pub settings: ProbeSettings,
    pub stats: Arc<CheckStats>,
}

// Derive would require `R: Clone` and `E: Clone`.
impl<R, E> Clone for CheckContext<R, E> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            engine: Arc::clone(&self.engine),
            settings: self.settings,
            stats: Arc::clone(&self.stats),
        }
    }
}

/// Runs one check and returns the sealed record.
///
/// Never fails: a target that does not resolve yields a record with
/// `request_error` set and no host results. Every resolved address gets
/// exactly one result, at the same index.
pub async fn run_check<R, E>(ctx: &CheckContext<R, E>, params: &CheckParams) -> Arc<RequestRecord>
where
    R: AddressResolver,
    E: ProbeEngine,
{
    let mut record = RequestRecord::new();
    let target = normalize_target(&params.server);
    record.domain = target.domain().to_string();

    match resolve_target(&*ctx.resolver, &target).await {
        Ok(addresses) => {
            record.host_results = probe_hosts(
                Arc::clone(&ctx.engine),
                ctx.settings,
                target.server_name().map(str::to_string),
                &addresses,
                Arc::clone(&ctx.stats),
            )
            .await;
            record.addresses = addresses;
        }
        Err(e) => {
            log::warn!("{e}");
            ctx.stats.increment(CheckEvent::DnsLookupFailed);
            record.request_error = Some(DNS_LOOKUP_FAILED.to_string());
        }
    }

    record.finalize();
    ctx.stats.increment(CheckEvent::CheckCompleted);
    Arc::new(record)
}
