//! DNS resolver initialization.

use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::config::{LookupIpStrategy, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;

use crate::config::{DNS_ATTEMPTS, DNS_TIMEOUT_SECS};

/// Initializes the resolver used for `/check` targets.
///
/// Uses the platform's resolver configuration (`/etc/resolv.conf` and
/// friends), falling back to the library default upstreams if it cannot be
/// read. Both address families are queried so every A and AAAA record is
/// probed.
pub fn init_resolver() -> Arc<TokioAsyncResolver> {
    let (config, mut opts) = match hickory_resolver::system_conf::read_system_conf() {
        Ok(system) => system,
        Err(e) => {
            log::warn!("Failed to read system DNS configuration, using defaults: {e}");
            (ResolverConfig::default(), ResolverOpts::default())
        }
    };

    opts.timeout = Duration::from_secs(DNS_TIMEOUT_SECS);
    opts.attempts = DNS_ATTEMPTS;
    // Targets are fully qualified; never append search domains
    opts.ndots = 0;
    opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;

    Arc::new(TokioAsyncResolver::tokio(config, opts))
}
