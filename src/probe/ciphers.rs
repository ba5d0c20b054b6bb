//! Cipher suite offers used by the three probes.
//!
//! Each entry carries its IANA name and wire id alongside the OpenSSL name
//! the engine needs. Order matters: it is the order offered in the
//! ClientHello.

/// A TLS cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherSuite {
    /// IANA wire identifier
    pub id: u16,
    /// IANA standard name
    pub name: &'static str,
    /// OpenSSL cipher string name
    pub openssl_name: &'static str,
    /// Export-grade suite (40/56-bit, 512-bit DH)
    pub export: bool,
}

const fn suite(id: u16, name: &'static str, openssl_name: &'static str) -> CipherSuite {
    CipherSuite {
        id,
        name,
        openssl_name,
        export: false,
    }
}

const fn export_suite(id: u16, name: &'static str, openssl_name: &'static str) -> CipherSuite {
    CipherSuite {
        id,
        name,
        openssl_name,
        export: true,
    }
}

/// Export-grade ephemeral DH suites.
pub const EXPORT_DHE_SUITES: &[CipherSuite] = &[
    export_suite(
        0x0014,
        "TLS_DHE_RSA_EXPORT_WITH_DES40_CBC_SHA",
        "EXP-EDH-RSA-DES-CBC-SHA",
    ),
    export_suite(
        0x0011,
        "TLS_DHE_DSS_EXPORT_WITH_DES40_CBC_SHA",
        "EXP-EDH-DSS-DES-CBC-SHA",
    ),
];

/// Full-strength ephemeral DH suites.
pub const STANDARD_DHE_SUITES: &[CipherSuite] = &[
    suite(
        0x009E,
        "TLS_DHE_RSA_WITH_AES_128_GCM_SHA256",
        "DHE-RSA-AES128-GCM-SHA256",
    ),
    suite(
        0x009F,
        "TLS_DHE_RSA_WITH_AES_256_GCM_SHA384",
        "DHE-RSA-AES256-GCM-SHA384",
    ),
    suite(
        0x00A2,
        "TLS_DHE_DSS_WITH_AES_128_GCM_SHA256",
        "DHE-DSS-AES128-GCM-SHA256",
    ),
    suite(
        0x00A3,
        "TLS_DHE_DSS_WITH_AES_256_GCM_SHA384",
        "DHE-DSS-AES256-GCM-SHA384",
    ),
    suite(
        0x0067,
        "TLS_DHE_RSA_WITH_AES_128_CBC_SHA256",
        "DHE-RSA-AES128-SHA256",
    ),
    suite(
        0x006B,
        "TLS_DHE_RSA_WITH_AES_256_CBC_SHA256",
        "DHE-RSA-AES256-SHA256",
    ),
    suite(
        0x0033,
        "TLS_DHE_RSA_WITH_AES_128_CBC_SHA",
        "DHE-RSA-AES128-SHA",
    ),
    suite(
        0x0039,
        "TLS_DHE_RSA_WITH_AES_256_CBC_SHA",
        "DHE-RSA-AES256-SHA",
    ),
    suite(
        0x0032,
        "TLS_DHE_DSS_WITH_AES_128_CBC_SHA",
        "DHE-DSS-AES128-SHA",
    ),
    suite(
        0x0038,
        "TLS_DHE_DSS_WITH_AES_256_CBC_SHA",
        "DHE-DSS-AES256-SHA",
    ),
    suite(
        0x0016,
        "TLS_DHE_RSA_WITH_3DES_EDE_CBC_SHA",
        "EDH-RSA-DES-CBC3-SHA",
    ),
    suite(
        0x0013,
        "TLS_DHE_DSS_WITH_3DES_EDE_CBC_SHA",
        "EDH-DSS-DES-CBC3-SHA",
    ),
    suite(0x0015, "TLS_DHE_RSA_WITH_DES_CBC_SHA", "EDH-RSA-DES-CBC-SHA"),
    suite(0x0012, "TLS_DHE_DSS_WITH_DES_CBC_SHA", "EDH-DSS-DES-CBC-SHA"),
];

/// Chrome's default offer, ECDHE first.
pub const BROWSER_SUITES: &[CipherSuite] = &[
    suite(
        0xC02B,
        "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
        "ECDHE-ECDSA-AES128-GCM-SHA256",
    ),
    suite(
        0xC02F,
        "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
        "ECDHE-RSA-AES128-GCM-SHA256",
    ),
    suite(
        0x009E,
        "TLS_DHE_RSA_WITH_AES_128_GCM_SHA256",
        "DHE-RSA-AES128-GCM-SHA256",
    ),
    suite(
        0xCCA9,
        "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
        "ECDHE-ECDSA-CHACHA20-POLY1305",
    ),
    suite(
        0xCCA8,
        "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
        "ECDHE-RSA-CHACHA20-POLY1305",
    ),
    suite(
        0xC00A,
        "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA",
        "ECDHE-ECDSA-AES256-SHA",
    ),
    suite(
        0xC014,
        "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
        "ECDHE-RSA-AES256-SHA",
    ),
    suite(
        0x0039,
        "TLS_DHE_RSA_WITH_AES_256_CBC_SHA",
        "DHE-RSA-AES256-SHA",
    ),
    suite(
        0xC009,
        "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA",
        "ECDHE-ECDSA-AES128-SHA",
    ),
    suite(
        0xC013,
        "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
        "ECDHE-RSA-AES128-SHA",
    ),
    suite(
        0x0033,
        "TLS_DHE_RSA_WITH_AES_128_CBC_SHA",
        "DHE-RSA-AES128-SHA",
    ),
    suite(
        0x009C,
        "TLS_RSA_WITH_AES_128_GCM_SHA256",
        "AES128-GCM-SHA256",
    ),
    suite(0x0035, "TLS_RSA_WITH_AES_256_CBC_SHA", "AES256-SHA"),
    suite(0x002F, "TLS_RSA_WITH_AES_128_CBC_SHA", "AES128-SHA"),
    suite(0x000A, "TLS_RSA_WITH_3DES_EDE_CBC_SHA", "DES-CBC3-SHA"),
];

/// Finds a known suite by its OpenSSL name.
pub fn find_by_openssl_name(name: &str) -> Option<&'static CipherSuite> {
    EXPORT_DHE_SUITES
        .iter()
        .chain(STANDARD_DHE_SUITES)
        .chain(BROWSER_SUITES)
        .find(|suite| suite.openssl_name == name)
}

/// Finds a known suite by its wire id.
pub fn find_by_id(id: u16) -> Option<&'static CipherSuite> {
    EXPORT_DHE_SUITES
        .iter()
        .chain(STANDARD_DHE_SUITES)
        .chain(BROWSER_SUITES)
        .find(|suite| suite.id == id)
}

/// OpenSSL cipher string offering exactly `suites`, in order.
///
/// The security level is dropped to zero so short DH groups are reported
/// rather than rejected by the client.
pub fn openssl_cipher_list(suites: &[CipherSuite]) -> String {
    let mut list = suites
        .iter()
        .map(|suite| suite.openssl_name)
        .collect::<Vec<_>>()
        .join(":");
    list.push_str(":@SECLEVEL=0");
    list
}
