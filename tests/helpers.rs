// Shared test helpers: a table-driven resolver, a scripted probe engine, an
// in-memory output destination, and a server running on an ephemeral port.

#![allow(dead_code)] // Each test file uses a different subset

use std::collections::HashMap;
use std::io::{self, Write};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use weakdh_check::check::CheckContext;
use weakdh_check::dns::AddressResolver;
use weakdh_check::error_handling::{CheckStats, ResolveError};
use weakdh_check::export::{OutputSink, SinkTask};
use weakdh_check::models::{CryptoParameter, DhParams};
use weakdh_check::probe::{
    HandshakeConfig, HandshakeTranscript, ProbeEngine, ProbeKind, ProbeSettings,
};
use weakdh_check::server::{serve, AppState};
use weakdh_check::OverflowPolicy;

pub const BROWSER_CIPHER: &str = "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256";

/// Resolver answering from a fixed table.
#[derive(Default)]
pub struct FakeResolver {
    answers: HashMap<String, Vec<IpAddr>>,
}

impl FakeResolver {
    pub fn with(mut self, host: &str, addresses: &[&str]) -> Self {
        self.answers
            .insert(host.to_string(), addresses.iter().map(|a| ip(a)).collect());
        self
    }
}

impl AddressResolver for FakeResolver {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        self.answers
            .get(host)
            .cloned()
            .ok_or_else(|| ResolveError::Lookup {
                host: host.to_string(),
                message: "no such host".to_string(),
            })
    }
}

/// How a fake host behaves.
#[derive(Clone)]
pub struct HostScript {
    /// Every dial is refused with this message
    pub refuse: Option<String>,
    /// Delay before each dial completes
    pub dial_delay: Duration,
    pub export: HandshakeTranscript,
    pub standard: HandshakeTranscript,
    pub browser: HandshakeTranscript,
}

impl Default for HostScript {
    /// A modern server: no export suites, 2048-bit DHE, ECDHE for browsers.
    fn default() -> Self {
        Self {
            refuse: None,
            dial_delay: Duration::ZERO,
            export: HandshakeTranscript::failed("sslv3 alert handshake failure"),
            standard: HandshakeTranscript {
                cipher_suite: Some("TLS_DHE_RSA_WITH_AES_128_GCM_SHA256".to_string()),
                server_certificates: 2,
                dh_params: Some(dh_params(2048)),
                ..Default::default()
            },
            browser: HandshakeTranscript {
                cipher_suite: Some(BROWSER_CIPHER.to_string()),
                server_certificates: 2,
                ..Default::default()
            },
        }
    }
}

/// Probe engine replaying a `HostScript` per address.
#[derive(Default)]
pub struct FakeEngine {
    hosts: HashMap<IpAddr, HostScript>,
    server_names: Mutex<Vec<(IpAddr, Option<String>)>>,
}

impl FakeEngine {
    pub fn host(mut self, address: &str, script: HostScript) -> Self {
        self.hosts.insert(ip(address), script);
        self
    }

    /// Every SNI value seen, with the address it was sent to.
    pub fn server_names(&self) -> Vec<(IpAddr, Option<String>)> {
        self.server_names.lock().unwrap().clone()
    }

    fn script(&self, address: IpAddr) -> HostScript {
        self.hosts.get(&address).cloned().unwrap_or_default()
    }
}

impl ProbeEngine for FakeEngine {
    type Conn = SocketAddr;

    async fn dial(&self, addr: SocketAddr) -> io::Result<SocketAddr> {
        let script = self.script(addr.ip());
        tokio::time::sleep(script.dial_delay).await;
        match script.refuse {
            Some(message) => Err(io::Error::new(io::ErrorKind::ConnectionRefused, message)),
            None => Ok(addr),
        }
    }

    async fn handshake(&self, conn: SocketAddr, config: &HandshakeConfig) -> HandshakeTranscript {
        self.server_names
            .lock()
            .unwrap()
            .push((conn.ip(), config.server_name.clone()));
        let script = self.script(conn.ip());
        if config.cipher_suites == ProbeKind::Export.cipher_suites() {
            script.export
        } else if config.cipher_suites == ProbeKind::StandardDhe.cipher_suites() {
            script.standard
        } else {
            script.browser
        }
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn dh_params(bits: usize) -> DhParams {
    DhParams {
        prime: CryptoParameter::new(vec![0xff; bits / 8], bits),
        generator: CryptoParameter::new(vec![2], 2),
        server_public: Some(CryptoParameter::new(vec![0x42; bits / 8], bits - 1)),
    }
}

pub fn context(
    resolver: FakeResolver,
    engine: FakeEngine,
) -> CheckContext<FakeResolver, FakeEngine> {
    CheckContext {
        resolver: Arc::new(resolver),
        engine: Arc::new(engine),
        settings: ProbeSettings {
            port: 443,
            host_deadline: Duration::from_secs(5),
        },
        stats: Arc::new(CheckStats::new()),
    }
}

/// In-memory output destination shared with the sink's writer task.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    /// Every line parsed as JSON. Panics on a partial or garbled line.
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.contents()
            .lines()
            .map(|line| serde_json::from_str(line).expect("each line is one JSON record"))
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A server on an ephemeral port backed by fakes.
pub struct TestServer {
    pub base_url: String,
    pub output: SharedBuffer,
    pub stats: Arc<CheckStats>,
    shutdown: CancellationToken,
    server: JoinHandle<io::Result<()>>,
    sink_task: Option<SinkTask>,
}

impl TestServer {
    pub async fn start(resolver: FakeResolver, engine: FakeEngine) -> Self {
        Self::start_with(resolver, engine, 16, OverflowPolicy::Block).await
    }

    pub async fn start_with(
        resolver: FakeResolver,
        engine: FakeEngine,
        capacity: usize,
        policy: OverflowPolicy,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let check = context(resolver, engine);
        let stats = Arc::clone(&check.stats);
        let output = SharedBuffer::default();
        let (sink, sink_task) =
            OutputSink::start(Box::new(output.clone()), capacity, policy, Arc::clone(&stats));

        let shutdown = CancellationToken::new();
        let server = tokio::spawn(serve(listener, AppState { check, sink }, shutdown.clone()));

        Self {
            base_url: format!("http://{addr}"),
            output,
            stats,
            shutdown,
            server,
            sink_task: Some(sink_task),
        }
    }

    pub async fn get(&self, path_and_query: &str) -> reqwest::Response {
        reqwest::get(format!("{}{}", self.base_url, path_and_query))
            .await
            .unwrap()
    }

    /// Shuts the output sink down while the server keeps running.
    pub async fn close_sink(&mut self) {
        if let Some(task) = self.sink_task.take() {
            task.shutdown().await;
        }
    }

    /// Stops the server, drains the sink, and returns what was written.
    pub async fn stop(mut self) -> SharedBuffer {
        self.shutdown.cancel();
        (&mut self.server).await.unwrap().unwrap();
        self.close_sink().await;
        self.output
    }
}
