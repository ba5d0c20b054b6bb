//! OpenSSL-backed probe engine.
//!
//! This module performs the actual probe handshakes:
//! - Offers exactly the suites a probe asks for, capped at the probe's version
//! - Skips certificate and hostname verification
//! - Reports the negotiated suite, the certificate count and the server's
//!   DH parameters, even when the handshake fails part way
//!
//! Uses `openssl` for the handshake and `tokio-openssl` to drive it over a
//! `tokio` TCP stream. Export-only offers never reach OpenSSL: they go
//! through a hand-built ClientHello in [`legacy`].

mod extract;
mod legacy;

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;

use openssl::error::ErrorStack;
use openssl::ssl::{Ssl, SslConnector, SslMethod, SslOptions, SslVerifyMode, SslVersion};
use strum::IntoEnumIterator;
use tokio::net::TcpStream;
use tokio_openssl::SslStream;

use crate::probe::{
    openssl_cipher_list, HandshakeConfig, HandshakeTranscript, ProbeEngine, ProbeKind, TlsVersion,
};

use extract::read_transcript;

impl From<TlsVersion> for SslVersion {
    fn from(version: TlsVersion) -> Self {
        match version {
            TlsVersion::Ssl3 => SslVersion::SSL3,
            TlsVersion::Tls10 => SslVersion::TLS1,
            TlsVersion::Tls12 => SslVersion::TLS1_2,
        }
    }
}

/// Everything that shapes an `SslConnector`. The server name does not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConnectorKey {
    cipher_list: String,
    force_suites: bool,
    min_version: TlsVersion,
    max_version: TlsVersion,
    skip_verify: bool,
}

impl From<&HandshakeConfig> for ConnectorKey {
    fn from(config: &HandshakeConfig) -> Self {
        Self {
            cipher_list: openssl_cipher_list(config.cipher_suites),
            force_suites: config.force_suites,
            min_version: config.min_version,
            max_version: config.max_version,
            skip_verify: config.skip_verify,
        }
    }
}

/// Probe engine over OpenSSL.
///
/// Connectors for the OpenSSL-driven probes are prepared once.
pub struct OpensslEngine {
    connectors: HashMap<ConnectorKey, SslConnector>,
}

impl OpensslEngine {
    /// Prepares connectors for every probe kind that OpenSSL drives.
    ///
    /// # Errors
    ///
    /// Returns the OpenSSL error stack if a client context cannot be built
    /// for one of those probes' suite lists.
    pub fn new() -> Result<Self, ErrorStack> {
        let mut connectors = HashMap::new();
        for kind in ProbeKind::iter() {
            let config = kind.handshake_config(None);
            if config.is_export_only() {
                continue;
            }
            connectors.insert(ConnectorKey::from(&config), build_connector(&config)?);
        }
        log::debug!("TLS engine ready on {}", openssl::version::version());
        Ok(Self { connectors })
    }

    fn connector_for(&self, config: &HandshakeConfig) -> Result<SslConnector, ErrorStack> {
        match self.connectors.get(&ConnectorKey::from(config)) {
            Some(connector) => Ok(connector.clone()),
            None => build_connector(config),
        }
    }
}

impl ProbeEngine for OpensslEngine {
    type Conn = TcpStream;

    async fn dial(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        TcpStream::connect(addr).await
    }

    async fn handshake(&self, conn: TcpStream, config: &HandshakeConfig) -> HandshakeTranscript {
        if config.is_export_only() {
            return legacy::export_handshake(conn, config).await;
        }

        let ssl = match self
            .connector_for(config)
            .and_then(|connector| build_ssl(&connector, config))
        {
            Ok(ssl) => ssl,
            Err(e) => return HandshakeTranscript::failed(e.to_string()),
        };
        let mut stream = match SslStream::new(ssl, conn) {
            Ok(stream) => stream,
            Err(e) => return HandshakeTranscript::failed(e.to_string()),
        };

        let error = Pin::new(&mut stream)
            .connect()
            .await
            .err()
            .map(|e| e.to_string());
        read_transcript(stream.ssl(), config, error)
    }
}

/// Builds a client connector offering exactly `config.cipher_suites`.
pub(crate) fn build_connector(config: &HandshakeConfig) -> Result<SslConnector, ErrorStack> {
    let mut builder = SslConnector::builder(SslMethod::tls_client())?;
    builder.clear_options(SslOptions::NO_SSLV3);
    builder.set_min_proto_version(Some(config.min_version.into()))?;
    if config.force_suites {
        // TLS 1.3 suites are negotiated separately and would bypass the list.
        builder.set_max_proto_version(Some(config.max_version.into()))?;
    }
    builder.set_cipher_list(&openssl_cipher_list(config.cipher_suites))?;
    if config.skip_verify {
        builder.set_verify(SslVerifyMode::NONE);
    }
    Ok(builder.build())
}

/// Per-connection state: SNI only for hostnames, never hostname checks.
pub(crate) fn build_ssl(
    connector: &SslConnector,
    config: &HandshakeConfig,
) -> Result<Ssl, ErrorStack> {
    let server_name = config.server_name.as_deref();
    connector
        .configure()?
        .use_server_name_indication(server_name.is_some())
        .verify_hostname(!config.skip_verify && server_name.is_some())
        .into_ssl(server_name.unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::asn1::Asn1Time;
    use openssl::bn::BigNum;
    use openssl::dh::Dh;
    use openssl::hash::MessageDigest;
    use openssl::pkey::{PKey, Private};
    use openssl::rsa::Rsa;
    use openssl::ssl::SslAcceptor;
    use openssl::x509::{X509NameBuilder, X509};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn self_signed() -> (PKey<Private>, X509) {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "localhost").unwrap();
        let name = name.build();

        let mut cert = X509::builder().unwrap();
        cert.set_version(2).unwrap();
        cert.set_subject_name(&name).unwrap();
        cert.set_issuer_name(&name).unwrap();
        cert.set_pubkey(&key).unwrap();
        cert.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
        cert.set_not_after(&Asn1Time::days_from_now(1).unwrap()).unwrap();
        let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
        cert.set_serial_number(&serial).unwrap();
        cert.sign(&key, MessageDigest::sha256()).unwrap();
        (key, cert.build())
    }

    /// A local TLS 1.2 server that only speaks DHE-RSA with a 2048-bit group.
    async fn dhe_server() -> SocketAddr {
        let (key, cert) = self_signed();
        let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls_server()).unwrap();
        acceptor.set_private_key(&key).unwrap();
        acceptor.set_certificate(&cert).unwrap();
        acceptor
            .set_max_proto_version(Some(SslVersion::TLS1_2))
            .unwrap();
        acceptor.set_cipher_list("DHE-RSA-AES128-GCM-SHA256").unwrap();
        acceptor.set_tmp_dh(&Dh::get_2048_256().unwrap()).unwrap();
        let acceptor = acceptor.build();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let ssl = Ssl::new(acceptor.context()).unwrap();
            let mut stream = SslStream::new(ssl, socket).unwrap();
            if Pin::new(&mut stream).accept().await.is_ok() {
                // Hold the session open until the client hangs up.
                let mut buf = [0u8; 1];
                let _ = stream.read(&mut buf).await;
            }
        });
        addr
    }

    #[test]
    fn test_engine_builds() {
        let engine = OpensslEngine::new().unwrap();
        for kind in [ProbeKind::StandardDhe, ProbeKind::Browser] {
            let config = kind.handshake_config(None);
            assert!(engine.connectors.contains_key(&ConnectorKey::from(&config)));
        }
        let export = ProbeKind::Export.handshake_config(None);
        assert!(!engine.connectors.contains_key(&ConnectorKey::from(&export)));
    }

    #[tokio::test]
    async fn test_dhe_handshake_reports_server_group() {
        let addr = dhe_server().await;
        let engine = OpensslEngine::new().unwrap();

        let conn = engine.dial(addr).await.unwrap();
        let transcript = engine
            .handshake(conn, &ProbeKind::StandardDhe.handshake_config(None))
            .await;

        assert_eq!(transcript.error, None);
        assert_eq!(
            transcript.cipher_suite.as_deref(),
            Some("TLS_DHE_RSA_WITH_AES_128_GCM_SHA256")
        );
        assert_eq!(transcript.server_certificates, 1);
        let params = transcript.dh_params.unwrap();
        assert_eq!(params.bits(), 2048);
        assert!(params.server_public.is_some());
        assert_eq!(transcript.export_dh_params, None);
    }

    #[tokio::test]
    async fn test_export_offer_bypasses_openssl() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut header = [0u8; 5];
            socket.read_exact(&mut header).await.unwrap();
            let len = usize::from(u16::from_be_bytes([header[3], header[4]]));
            let mut hello = vec![0u8; len];
            socket.read_exact(&mut hello).await.unwrap();
            // Fatal handshake_failure alert.
            socket.write_all(&[21, 3, 1, 0, 2, 2, 40]).await.unwrap();
            (header, hello)
        });

        let engine = OpensslEngine::new().unwrap();
        let conn = engine.dial(addr).await.unwrap();
        let transcript = engine
            .handshake(conn, &ProbeKind::Export.handshake_config(None))
            .await;

        let (header, hello) = server.await.unwrap();
        assert_eq!(header[0], 22);
        // Offered suites sit after version, random and the empty session id.
        assert_eq!(&hello[41..45], &[0x00, 0x14, 0x00, 0x11]);
        assert_eq!(
            transcript.error.as_deref(),
            Some("remote error: handshake failure")
        );
        assert_eq!(transcript.export_dh_params, None);
    }

    #[test]
    fn test_connector_key_ignores_server_name() {
        let a = ProbeKind::StandardDhe.handshake_config(Some("a.example"));
        let b = ProbeKind::StandardDhe.handshake_config(None);
        assert_eq!(ConnectorKey::from(&a), ConnectorKey::from(&b));
    }

    #[test]
    fn test_build_ssl_with_and_without_server_name() {
        for kind in [ProbeKind::StandardDhe, ProbeKind::Browser] {
            let connector = build_connector(&kind.handshake_config(None)).unwrap();
            assert!(build_ssl(&connector, &kind.handshake_config(None)).is_ok());
            assert!(build_ssl(&connector, &kind.handshake_config(Some("example.com"))).is_ok());
        }
    }

    #[test]
    fn test_tls_version_mapping() {
        assert!(SslVersion::from(TlsVersion::Ssl3) == SslVersion::SSL3);
        assert!(SslVersion::from(TlsVersion::Tls10) == SslVersion::TLS1);
        assert!(SslVersion::from(TlsVersion::Tls12) == SslVersion::TLS1_2);
    }

    #[tokio::test]
    async fn test_handshake_with_silent_peer_fails_cleanly() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hang up without answering the ClientHello.
            if let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let engine = OpensslEngine::new().unwrap();
        let conn = engine.dial(addr).await.unwrap();
        let transcript = engine
            .handshake(conn, &ProbeKind::Browser.handshake_config(None))
            .await;

        assert!(transcript.error.is_some());
        assert_eq!(transcript.server_certificates, 0);
        assert_eq!(transcript.dh_params, None);
        assert_eq!(transcript.export_dh_params, None);
    }

    #[tokio::test]
    async fn test_dial_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let engine = OpensslEngine::new().unwrap();
        assert!(engine.dial(addr).await.is_err());
    }
}
