//! Target normalization.
//!
//! Turns the raw `server` query value into either a literal address, which
//! skips resolution, or a hostname to resolve. Nothing here fails: anything
//! that is neither an IP nor a URL with a host is used verbatim as a hostname,
//! and the resolver decides whether it means anything.

use std::net::IpAddr;

use url::{Host, Url};

/// What a `/check` request points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A literal IP address. Probed directly.
    Address(IpAddr),
    /// A hostname to resolve.
    Hostname(String),
}

impl Target {
    /// Domain recorded in the request record. Empty for literal addresses.
    pub fn domain(&self) -> &str {
        match self {
            Target::Address(_) => "",
            Target::Hostname(host) => host,
        }
    }

    /// Server name to send during the handshake.
    ///
    /// Literal addresses have no name to offer, so they send none.
    pub fn server_name(&self) -> Option<&str> {
        match self {
            Target::Address(_) => None,
            Target::Hostname(host) => Some(host),
        }
    }
}

/// Normalizes a raw target string.
///
/// # Examples
///
/// ```
/// use weakdh_check::target::{normalize_target, Target};
///
/// assert_eq!(
///     normalize_target("https://example.com:8443/index.html"),
///     Target::Hostname("example.com".to_string())
/// );
/// assert!(matches!(normalize_target("8.8.8.8"), Target::Address(_)));
/// ```
pub fn normalize_target(raw: &str) -> Target {
    let raw = raw.trim();
    if let Ok(ip) = raw.parse::<IpAddr>() {
        return Target::Address(ip);
    }
    match host_from_url(raw) {
        Some(Host::Ipv4(ip)) => Target::Address(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => Target::Address(IpAddr::V6(ip)),
        Some(Host::Domain(domain)) => Target::Hostname(domain),
        None => Target::Hostname(raw.to_string()),
    }
}

/// Host component of `raw` if it parses as a URL with a non-empty host.
fn host_from_url(raw: &str) -> Option<Host<String>> {
    let parsed = Url::parse(raw).ok()?;
    match parsed.host()? {
        Host::Domain(domain) if domain.is_empty() => None,
        host => Some(host.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hostname(s: &str) -> Target {
        Target::Hostname(s.to_string())
    }

    #[test]
    fn test_literal_ipv4() {
        let target = normalize_target("8.8.8.8");
        assert_eq!(target, Target::Address("8.8.8.8".parse().unwrap()));
        assert_eq!(target.domain(), "");
        assert_eq!(target.server_name(), None);
    }

    #[test]
    fn test_literal_ipv6() {
        assert_eq!(
            normalize_target("2001:db8::1"),
            Target::Address("2001:db8::1".parse().unwrap())
        );
    }

    #[test]
    fn test_bare_hostname_is_verbatim() {
        let target = normalize_target("example.com");
        assert_eq!(target, hostname("example.com"));
        assert_eq!(target.domain(), "example.com");
        assert_eq!(target.server_name(), Some("example.com"));
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        assert_eq!(normalize_target("  example.com \n"), hostname("example.com"));
    }

    #[test]
    fn test_url_strips_scheme_path_and_port() {
        assert_eq!(
            normalize_target("https://example.com:8443/some/path?q=1"),
            hostname("example.com")
        );
        assert_eq!(normalize_target("http://example.com"), hostname("example.com"));
    }

    #[test]
    fn test_url_with_ip_host_is_an_address() {
        assert_eq!(
            normalize_target("https://192.0.2.7:443/"),
            Target::Address("192.0.2.7".parse().unwrap())
        );
        assert_eq!(
            normalize_target("https://[2001:db8::2]:8443/"),
            Target::Address("2001:db8::2".parse().unwrap())
        );
    }

    #[test]
    fn test_host_port_without_scheme_is_verbatim() {
        // Parses as scheme "example.com" with no host, so it is not a usable URL.
        assert_eq!(normalize_target("example.com:443"), hostname("example.com:443"));
    }

    #[test]
    fn test_url_without_host_is_verbatim() {
        assert_eq!(normalize_target("mailto:someone"), hostname("mailto:someone"));
    }

    #[test]
    fn test_garbage_is_verbatim() {
        assert_eq!(normalize_target("not a host"), hostname("not a host"));
    }
}
