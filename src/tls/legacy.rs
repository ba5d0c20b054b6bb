//! Export-grade DHE probing without OpenSSL.
//!
//! Current OpenSSL builds carry no export suites at all, so this probe writes
//! its own ClientHello and reads the server's first flight up to
//! ServerHelloDone. No keys are derived: once the key exchange has been read
//! the connection is dropped.

use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::models::{CryptoParameter, DhParams};
use crate::probe::{find_by_id, HandshakeConfig, HandshakeTranscript, TlsVersion};

const CONTENT_ALERT: u8 = 21;
const CONTENT_HANDSHAKE: u8 = 22;

const CLIENT_HELLO: u8 = 1;
const SERVER_HELLO: u8 = 2;
const CERTIFICATE: u8 = 11;
const SERVER_KEY_EXCHANGE: u8 = 12;
const SERVER_HELLO_DONE: u8 = 14;

const EXTENSION_SERVER_NAME: u16 = 0x0000;
const SERVER_NAME_HOST: u8 = 0;

/// Largest record a compliant peer may send (plaintext plus expansion).
const MAX_RECORD_LEN: usize = 16384 + 2048;
/// Upper bound on the whole server flight, certificates included.
const MAX_FLIGHT_LEN: usize = 256 * 1024;

#[derive(Error, Debug)]
enum ExchangeError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("remote error: {}", alert_description(*.0))]
    Alert(u8),

    #[error("malformed {0}")]
    Malformed(&'static str),

    #[error("{0}")]
    Unexpected(String),
}

fn alert_description(code: u8) -> String {
    match code {
        40 => "handshake failure".to_string(),
        47 => "illegal parameter".to_string(),
        70 => "protocol version".to_string(),
        71 => "insufficient security".to_string(),
        80 => "internal error".to_string(),
        other => format!("alert({other})"),
    }
}

/// Runs the export probe over `stream`.
///
/// Reaching ServerHelloDone counts as success. Whatever was read before a
/// failure is still reported.
pub(crate) async fn export_handshake<S>(
    mut stream: S,
    config: &HandshakeConfig,
) -> HandshakeTranscript
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut random = [0u8; 32];
    if let Err(e) = openssl::rand::rand_bytes(&mut random) {
        return HandshakeTranscript::failed(e.to_string());
    }
    let hello = client_hello(config, &random);

    let mut flight = ServerFlight::default();
    let error = exchange(&mut stream, &hello, config, &mut flight)
        .await
        .err()
        .map(|e| e.to_string());
    flight.into_transcript(config, error)
}

/// Builds a single-record ClientHello offering exactly `config.cipher_suites`.
fn client_hello(config: &HandshakeConfig, random: &[u8; 32]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&config.max_version.wire_version().to_be_bytes());
    body.extend_from_slice(random);
    body.push(0); // no session id
    put_u16(&mut body, config.cipher_suites.len() * 2);
    for suite in config.cipher_suites {
        body.extend_from_slice(&suite.id.to_be_bytes());
    }
    body.extend_from_slice(&[1, 0]); // null compression only

    if let Some(name) = config.server_name.as_deref() {
        let name = name.as_bytes();
        let mut extensions = Vec::new();
        extensions.extend_from_slice(&EXTENSION_SERVER_NAME.to_be_bytes());
        put_u16(&mut extensions, name.len() + 5);
        put_u16(&mut extensions, name.len() + 3);
        extensions.push(SERVER_NAME_HOST);
        put_u16(&mut extensions, name.len());
        extensions.extend_from_slice(name);

        put_u16(&mut body, extensions.len());
        body.extend_from_slice(&extensions);
    }

    let mut handshake = vec![CLIENT_HELLO];
    put_u24(&mut handshake, body.len());
    handshake.extend_from_slice(&body);

    let record_version = config.max_version.min(TlsVersion::Tls10).wire_version();
    let mut record = vec![CONTENT_HANDSHAKE];
    record.extend_from_slice(&record_version.to_be_bytes());
    put_u16(&mut record, handshake.len());
    record.extend_from_slice(&handshake);
    record
}

fn put_u16(buf: &mut Vec<u8>, n: usize) {
    buf.extend_from_slice(&(n as u16).to_be_bytes());
}

fn put_u24(buf: &mut Vec<u8>, n: usize) {
    buf.extend_from_slice(&(n as u32).to_be_bytes()[1..]);
}

async fn exchange<S>(
    stream: &mut S,
    hello: &[u8],
    config: &HandshakeConfig,
    flight: &mut ServerFlight,
) -> Result<(), ExchangeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(hello).await?;
    stream.flush().await?;

    let mut pending = Vec::new();
    let mut received = 0;
    loop {
        let (content_type, fragment) = read_record(stream).await?;
        received += fragment.len();
        if received > MAX_FLIGHT_LEN {
            return Err(ExchangeError::Unexpected("server flight too large".to_string()));
        }

        match content_type {
            CONTENT_ALERT => {
                let code = fragment.get(1).copied().unwrap_or(0);
                return Err(ExchangeError::Alert(code));
            }
            CONTENT_HANDSHAKE => pending.extend_from_slice(&fragment),
            other => {
                return Err(ExchangeError::Unexpected(format!(
                    "unexpected record type {other}"
                )))
            }
        }

        // Handshake messages may span records, and one record may hold several.
        while pending.len() >= 4 {
            let len = (usize::from(pending[1]) << 16)
                | (usize::from(pending[2]) << 8)
                | usize::from(pending[3]);
            if pending.len() < 4 + len {
                break;
            }
            let msg_type = pending[0];
            let body: Vec<u8> = pending.drain(..4 + len).skip(4).collect();
            if flight.absorb(msg_type, &body, config)? {
                return Ok(());
            }
        }
    }
}

async fn read_record<S>(stream: &mut S) -> Result<(u8, Vec<u8>), ExchangeError>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; 5];
    stream.read_exact(&mut header).await?;
    if header[1] != 3 {
        return Err(ExchangeError::Unexpected(
            "server did not answer with a TLS record".to_string(),
        ));
    }
    let len = usize::from(u16::from_be_bytes([header[3], header[4]]));
    if len > MAX_RECORD_LEN {
        return Err(ExchangeError::Malformed("record length"));
    }
    let mut fragment = vec![0u8; len];
    stream.read_exact(&mut fragment).await?;
    Ok((header[0], fragment))
}

/// What the server has revealed so far.
#[derive(Debug, Default)]
struct ServerFlight {
    cipher_id: Option<u16>,
    certificates: usize,
    dh_params: Option<DhParams>,
}

impl ServerFlight {
    /// Takes in one handshake message. Returns `true` at ServerHelloDone.
    fn absorb(
        &mut self,
        msg_type: u8,
        body: &[u8],
        config: &HandshakeConfig,
    ) -> Result<bool, ExchangeError> {
        match msg_type {
            SERVER_HELLO => {
                let id = parse_server_hello(body)?;
                if !config.cipher_suites.iter().any(|s| s.id == id) {
                    return Err(ExchangeError::Unexpected(format!(
                        "server selected unoffered suite 0x{id:04X}"
                    )));
                }
                self.cipher_id = Some(id);
            }
            CERTIFICATE => self.certificates = count_certificates(body)?,
            SERVER_KEY_EXCHANGE => self.dh_params = Some(parse_dh_key_exchange(body)?),
            SERVER_HELLO_DONE => return Ok(true),
            _ => {}
        }
        Ok(false)
    }

    fn into_transcript(
        self,
        config: &HandshakeConfig,
        error: Option<String>,
    ) -> HandshakeTranscript {
        let suite = self.cipher_id.and_then(find_by_id);
        let export = suite.map_or(config.is_export_only(), |s| s.export);
        let (dh_params, export_dh_params) = if export {
            (None, self.dh_params)
        } else {
            (self.dh_params, None)
        };

        HandshakeTranscript {
            error,
            cipher_suite: suite.map(|s| s.name.to_string()),
            server_certificates: self.certificates,
            dh_params,
            export_dh_params,
        }
    }
}

/// Returns the suite the server picked.
fn parse_server_hello(body: &[u8]) -> Result<u16, ExchangeError> {
    let mut r = Reader::new(body, "ServerHello");
    r.take(2)?; // version
    r.take(32)?; // random
    r.vec8()?; // session id
    let suite = r.u16()?;
    r.take(1)?; // compression
    Ok(suite)
}

fn count_certificates(body: &[u8]) -> Result<usize, ExchangeError> {
    let mut list = Reader::new(Reader::new(body, "Certificate").vec24()?, "Certificate");
    let mut count = 0;
    while !list.is_empty() {
        list.vec24()?;
        count += 1;
    }
    Ok(count)
}

/// Reads p, g and Ys from a DHE ServerKeyExchange. The signature is ignored.
fn parse_dh_key_exchange(body: &[u8]) -> Result<DhParams, ExchangeError> {
    let mut r = Reader::new(body, "ServerKeyExchange");
    let prime = CryptoParameter::from_be_bytes(r.vec16()?);
    let generator = CryptoParameter::from_be_bytes(r.vec16()?);
    let server_public = CryptoParameter::from_be_bytes(r.vec16()?);
    if prime.length == 0 {
        return Err(ExchangeError::Malformed("ServerKeyExchange"));
    }
    Ok(DhParams {
        prime,
        generator,
        server_public: Some(server_public),
    })
}

/// Cursor over a handshake message body.
struct Reader<'a> {
    buf: &'a [u8],
    what: &'static str,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8], what: &'static str) -> Self {
        Self { buf, what }
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ExchangeError> {
        if self.buf.len() < n {
            return Err(ExchangeError::Malformed(self.what));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u16(&mut self) -> Result<u16, ExchangeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn vec8(&mut self) -> Result<&'a [u8], ExchangeError> {
        let len = usize::from(self.take(1)?[0]);
        self.take(len)
    }

    fn vec16(&mut self) -> Result<&'a [u8], ExchangeError> {
        let len = usize::from(self.u16()?);
        self.take(len)
    }

    fn vec24(&mut self) -> Result<&'a [u8], ExchangeError> {
        let b = self.take(3)?;
        let len = (usize::from(b[0]) << 16) | (usize::from(b[1]) << 8) | usize::from(b[2]);
        self.take(len)
    }
}
