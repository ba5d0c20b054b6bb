//! Request and host result records.
//!
//! `RequestRecord` is the unit of output: one per handled `/check` request.
//! It is built up by the check pipeline and becomes immutable once every host
//! task has reported back.

use std::net::IpAddr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Serialize, Serializer};

/// Query parameters accepted by `GET /check/`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CheckParams {
    /// A literal IP, a hostname, or a URL containing a hostname.
    pub server: String,
}

/// Result of a single `/check` request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RequestRecord {
    /// Hostname that was resolved. Empty when a literal IP was given.
    pub domain: String,
    /// Addresses in resolver order.
    #[serde(rename = "ip_addresses")]
    pub addresses: Vec<IpAddr>,
    /// One entry per address, index-aligned with `addresses`.
    #[serde(rename = "results")]
    pub host_results: Vec<HostResult>,
    #[serde(rename = "error")]
    pub request_error: Option<String>,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

impl RequestRecord {
    /// Creates an empty record stamped with the current time.
    pub fn new() -> Self {
        Self {
            domain: String::new(),
            addresses: Vec::new(),
            host_results: Vec::new(),
            request_error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seals the record once all host tasks are done.
    pub fn finalize(&mut self) {
        if self.timestamp.is_empty() {
            self.timestamp = chrono::Utc::now().to_rfc3339();
        }
    }
}

impl Default for RequestRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Probe results for one resolved address.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HostResult {
    #[serde(rename = "ip")]
    pub address: IpAddr,
    pub has_tls: bool,
    #[serde(rename = "dh_params")]
    pub standard_dh_params: Option<DhParams>,
    pub export_dh_params: Option<DhParams>,
    #[serde(rename = "chrome_dh_params")]
    pub browser_dh_params: Option<DhParams>,
    #[serde(rename = "chrome_cipher")]
    pub negotiated_cipher: Option<String>,
    #[serde(rename = "error")]
    pub host_error: Option<String>,
}

impl HostResult {
    /// A result with nothing observed, used when the host task itself died.
    pub fn failed(address: IpAddr, error: impl Into<String>) -> Self {
        Self {
            address,
            has_tls: false,
            standard_dh_params: None,
            export_dh_params: None,
            browser_dh_params: None,
            negotiated_cipher: None,
            host_error: Some(error.into()),
        }
    }
}

/// Diffie-Hellman parameters observed in a ServerKeyExchange.
///
/// Produced by the TLS engine and passed through untouched.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DhParams {
    pub prime: CryptoParameter,
    pub generator: CryptoParameter,
    pub server_public: Option<CryptoParameter>,
}

impl DhParams {
    /// Bit length of the prime modulus.
    pub fn bits(&self) -> usize {
        self.prime.length
    }
}

/// A big-endian integer with its bit length.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CryptoParameter {
    #[serde(serialize_with = "serialize_base64")]
    pub value: Vec<u8>,
    pub length: usize,
}

impl CryptoParameter {
    pub fn new(value: Vec<u8>, length: usize) -> Self {
        Self { value, length }
    }

    /// Reads an unsigned big-endian integer as it appears on the wire.
    ///
    /// Leading zero bytes are dropped, so zero has no bytes and no bits.
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        let value = bytes[start..].to_vec();
        let length = match value.first() {
            Some(first) => (value.len() - 1) * 8 + (8 - first.leading_zeros() as usize),
            None => 0,
        };
        Self { value, length }
    }
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}
