//! Address resolution.
//!
//! Hostnames are resolved through an [`AddressResolver`]; literal addresses
//! pass through untouched. The returned order is the resolver's order, which
//! later stages index by position.

use std::future::Future;
use std::net::IpAddr;

use hickory_resolver::TokioAsyncResolver;

use crate::error_handling::ResolveError;
use crate::target::Target;

/// Resolves hostnames to addresses.
///
/// Implemented for `hickory_resolver::TokioAsyncResolver`; tests provide
/// their own implementations.
pub trait AddressResolver: Send + Sync + 'static {
    /// Returns every address for `host` in the order the resolver produced
    /// them. An empty answer is an error.
    fn lookup(&self, host: &str) -> impl Future<Output = Result<Vec<IpAddr>, ResolveError>> + Send;
}

impl AddressResolver for TokioAsyncResolver {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        let response = self
            .lookup_ip(host)
            .await
            .map_err(|e| ResolveError::Lookup {
                host: host.to_string(),
                message: e.to_string(),
            })?;
        let addresses: Vec<IpAddr> = response.iter().collect();
        if addresses.is_empty() {
            return Err(ResolveError::NoAddresses {
                host: host.to_string(),
            });
        }
        Ok(addresses)
    }
}

/// Produces the ordered address list for a target.
///
/// # Errors
///
/// Returns a `ResolveError` if the hostname fails to resolve or resolves to
/// nothing.
pub async fn resolve_target<R: AddressResolver>(
    resolver: &R,
    target: &Target,
) -> Result<Vec<IpAddr>, ResolveError> {
    match target {
        Target::Address(ip) => Ok(vec![*ip]),
        Target::Hostname(host) => {
            let addresses = resolver.lookup(host).await?;
            if addresses.is_empty() {
                return Err(ResolveError::NoAddresses { host: host.clone() });
            }
            log::debug!("Resolved {host} to {} address(es)", addresses.len());
            Ok(addresses)
        }
    }
}
