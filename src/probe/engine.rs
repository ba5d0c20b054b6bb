//! The boundary between the orchestrator and the TLS implementation.
//!
//! The orchestrator decides what to offer and when to give up; a
//! [`ProbeEngine`] dials and performs the handshake, then reports what it saw.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use strum_macros::{EnumIter, IntoStaticStr};

use super::ciphers::{
    CipherSuite, BROWSER_SUITES, EXPORT_DHE_SUITES, STANDARD_DHE_SUITES,
};
use crate::models::DhParams;

/// The three probes run against every host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ProbeKind {
    /// Export-grade DHE suites only
    Export,
    /// Full-strength DHE suites only
    StandardDhe,
    /// Chrome's default offer
    Browser,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Suites offered by this probe, in ClientHello order.
    pub fn cipher_suites(self) -> &'static [CipherSuite] {
        match self {
            ProbeKind::Export => EXPORT_DHE_SUITES,
            ProbeKind::StandardDhe => STANDARD_DHE_SUITES,
            ProbeKind::Browser => BROWSER_SUITES,
        }
    }

    /// Highest protocol version this probe offers.
    ///
    /// Export suites may not be negotiated above TLS 1.0.
    pub fn max_version(self) -> TlsVersion {
        match self {
            ProbeKind::Export => TlsVersion::Tls10,
            ProbeKind::StandardDhe | ProbeKind::Browser => TlsVersion::Tls12,
        }
    }

    /// Handshake configuration for this probe.
    ///
    /// All probes force their suite list, accept anything down to SSL 3.0 and
    /// skip certificate verification.
    pub fn handshake_config(self, server_name: Option<&str>) -> HandshakeConfig {
        HandshakeConfig {
            cipher_suites: self.cipher_suites(),
            force_suites: true,
            min_version: TlsVersion::Ssl3,
            max_version: self.max_version(),
            server_name: server_name.map(str::to_string),
            skip_verify: true,
        }
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol versions bounding a probe's offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TlsVersion {
    Ssl3,
    Tls10,
    Tls12,
}

impl TlsVersion {
    /// The version as it appears in record and hello headers.
    pub fn wire_version(self) -> u16 {
        match self {
            TlsVersion::Ssl3 => 0x0300,
            TlsVersion::Tls10 => 0x0301,
            TlsVersion::Tls12 => 0x0303,
        }
    }
}

/// What to offer during one handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// Suites to offer, in order
    pub cipher_suites: &'static [CipherSuite],
    /// Offer only `cipher_suites`, never fall back to engine defaults
    pub force_suites: bool,
    /// Lowest protocol version to accept
    pub min_version: TlsVersion,
    /// Highest protocol version to offer
    pub max_version: TlsVersion,
    /// SNI value. `None` sends no server name.
    pub server_name: Option<String>,
    /// Accept any certificate
    pub skip_verify: bool,
}

impl HandshakeConfig {
    /// Whether every offered suite is export-grade.
    pub fn is_export_only(&self) -> bool {
        !self.cipher_suites.is_empty() && self.cipher_suites.iter().all(|s| s.export)
    }
}

/// What the engine observed during a handshake attempt.
///
/// Populated as far as the handshake got, so a failed handshake can still
/// carry the parameters of the server's key exchange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandshakeTranscript {
    /// Why the handshake failed, if it did
    pub error: Option<String>,
    /// IANA name of the negotiated suite
    pub cipher_suite: Option<String>,
    /// Number of certificates the server sent
    pub server_certificates: usize,
    /// DH parameters from a non-export key exchange
    pub dh_params: Option<DhParams>,
    /// DH parameters from an export-grade key exchange
    pub export_dh_params: Option<DhParams>,
}

impl HandshakeTranscript {
    /// A transcript with nothing observed.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn saw_certificate(&self) -> bool {
        self.server_certificates > 0
    }
}

/// Dials probe connections and runs handshakes over them.
///
/// Deadlines are applied by the caller around both futures.
pub trait ProbeEngine: Send + Sync + 'static {
    /// An established connection, ready for a handshake.
    type Conn: Send + 'static;

    /// Opens a TCP connection to `addr`.
    fn dial(&self, addr: SocketAddr) -> impl Future<Output = io::Result<Self::Conn>> + Send;

    /// Runs a handshake over `conn` and reports what happened.
    fn handshake(
        &self,
        conn: Self::Conn,
        config: &HandshakeConfig,
    ) -> impl Future<Output = HandshakeTranscript> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_probe_forces_suites_and_skips_verification() {
        for kind in ProbeKind::iter() {
            let config = kind.handshake_config(Some("example.com"));
            assert!(config.force_suites, "{kind} must force suites");
            assert!(config.skip_verify, "{kind} must skip verification");
            assert_eq!(config.min_version, TlsVersion::Ssl3);
            assert_eq!(config.server_name.as_deref(), Some("example.com"));
            assert!(!config.cipher_suites.is_empty());
        }
    }

    #[test]
    fn test_probe_kinds_offer_their_own_lists() {
        assert_eq!(ProbeKind::Export.cipher_suites(), EXPORT_DHE_SUITES);
        assert_eq!(ProbeKind::StandardDhe.cipher_suites(), STANDARD_DHE_SUITES);
        assert_eq!(ProbeKind::Browser.cipher_suites(), BROWSER_SUITES);
    }

    #[test]
    fn test_only_export_probe_stops_at_tls10() {
        assert_eq!(ProbeKind::Export.max_version(), TlsVersion::Tls10);
        assert!(ProbeKind::Export.handshake_config(None).is_export_only());
        for kind in [ProbeKind::StandardDhe, ProbeKind::Browser] {
            let config = kind.handshake_config(None);
            assert_eq!(config.max_version, TlsVersion::Tls12);
            assert!(!config.is_export_only());
        }
        assert_eq!(TlsVersion::Tls10.wire_version(), 0x0301);
    }

    #[test]
    fn test_no_server_name_for_addresses() {
        let config = ProbeKind::Browser.handshake_config(None);
        assert_eq!(config.server_name, None);
    }

    #[test]
    fn test_probe_kind_names() {
        assert_eq!(ProbeKind::StandardDhe.to_string(), "standard_dhe");
        assert_eq!(ProbeKind::Export.as_str(), "export");
    }

    #[test]
    fn test_transcript_helpers() {
        let failed = HandshakeTranscript::failed("alert handshake failure");
        assert!(!failed.succeeded());
        assert!(!failed.saw_certificate());

        let ok = HandshakeTranscript {
            server_certificates: 2,
            ..Default::default()
        };
        assert!(ok.succeeded());
        assert!(ok.saw_certificate());
    }
}
