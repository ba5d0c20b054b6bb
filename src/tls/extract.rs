//! Reading a handshake's outcome back out of the OpenSSL session.

use openssl::bn::BigNumRef;
use openssl::ssl::SslRef;

use crate::models::{CryptoParameter, DhParams};
use crate::probe::{find_by_openssl_name, HandshakeConfig, HandshakeTranscript};

/// Builds the transcript from whatever the session recorded.
///
/// Called after both successful and failed handshakes. On failure the
/// session may still hold the server's certificates and key exchange.
pub(crate) fn read_transcript(
    ssl: &SslRef,
    config: &HandshakeConfig,
    error: Option<String>,
) -> HandshakeTranscript {
    let negotiated = ssl.current_cipher();
    let cipher_suite = negotiated.map(|cipher| {
        cipher
            .standard_name()
            .map(str::to_string)
            .or_else(|| find_by_openssl_name(cipher.name()).map(|s| s.name.to_string()))
            .unwrap_or_else(|| cipher.name().to_string())
    });

    let server_certificates = match ssl.peer_cert_chain() {
        Some(chain) => chain.len(),
        None => usize::from(ssl.peer_certificate().is_some()),
    };

    // Without a negotiated suite, the offer decides: an export-only offer
    // can only have produced export parameters.
    let export = match negotiated {
        Some(cipher) => find_by_openssl_name(cipher.name()).is_some_and(|s| s.export),
        None => config.is_export_only(),
    };

    let params = server_dh_params(ssl);
    let (dh_params, export_dh_params) = if export {
        (None, params)
    } else {
        (params, None)
    };

    HandshakeTranscript {
        error,
        cipher_suite,
        server_certificates,
        dh_params,
        export_dh_params,
    }
}

/// The server's ephemeral DH group and public value, if it sent one.
///
/// ECDHE and RSA key exchanges yield `None`.
fn server_dh_params(ssl: &SslRef) -> Option<DhParams> {
    let key = ssl.peer_tmp_key().ok()?;
    let dh = key.dh().ok()?;
    Some(DhParams {
        prime: crypto_parameter(dh.prime_p()),
        generator: crypto_parameter(dh.generator()),
        server_public: Some(crypto_parameter(dh.public_key())),
    })
}

fn crypto_parameter(n: &BigNumRef) -> CryptoParameter {
    CryptoParameter::new(n.to_vec(), usize::try_from(n.num_bits()).unwrap_or(0))
}
