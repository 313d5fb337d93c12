//! Shared integration test helpers for par-remote.
//!
//! Provides a mock host bridge whose display factory hands out recording
//! transports, plus small helpers for waiting on session state.
//!
//! ```ignore
//! mod common;
//! use common::{MockHost, RecordingSurface};
//! ```
//!
//! `#![allow(dead_code)]` keeps per-file warnings quiet when a test file only
//! uses a subset of these helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use par_remote::clipboard::{MemoryClipboard, SharedClipboard};
use par_remote::host::{
    GatewayAddress, GatewayConfigStore, GatewayTokenService, HostBridge, HostError,
    PreviewService, RelayEndpoint, RelayService, SessionToken, TextSessionEvent,
    TextSessionHandle, TextSessionService,
};
use par_remote::input::InputBridge;
use par_remote::session::{ConnectionParams, Session, SessionId, SessionStatus};
use par_remote::transport::{
    DisplayTransportFactory, PointerState, RemoteTransport, TransportCapabilities,
    TransportConnection, TransportError, TransportEvent, TransportTarget,
};
use par_remote::viewport::{RenderSurface, Size};
use par_remote::{Config, SessionRegistry};
use par_remote_input::{KeyCodeSpace, RemoteKey};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::Instant;

// ============================================================================
// Recording transport
// ============================================================================

/// One outbound message captured by a [`RecordingTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Pointer(PointerState),
    Key { keysym: u32, pressed: bool },
    SecureAttention,
    Clipboard { mime: String, blobs: Vec<String> },
    Size(Size),
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub at: Instant,
    pub sent: Sent,
}

/// Outbound log shared between a transport and the test
#[derive(Debug, Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<Recorded>>>);

impl SentLog {
    pub fn all(&self) -> Vec<Recorded> {
        self.0.lock().clone()
    }

    pub fn messages(&self) -> Vec<Sent> {
        self.0.lock().iter().map(|r| r.sent.clone()).collect()
    }

    pub fn sizes(&self) -> Vec<Size> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Sent::Size(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn keys(&self) -> Vec<(u32, bool)> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Sent::Key { keysym, pressed } => Some((keysym, pressed)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, sent: Sent) {
        self.0.lock().push(Recorded {
            at: Instant::now(),
            sent,
        });
    }
}

pub struct RecordingTransport {
    capabilities: TransportCapabilities,
    code_space: KeyCodeSpace,
    log: SentLog,
    disconnected: Arc<AtomicBool>,
}

impl RecordingTransport {
    fn check(&self) -> Result<(), TransportError> {
        if self.disconnected.load(Ordering::SeqCst) {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

impl RemoteTransport for RecordingTransport {
    fn capabilities(&self) -> TransportCapabilities {
        self.capabilities
    }

    fn code_space(&self) -> KeyCodeSpace {
        self.code_space
    }

    fn send_pointer(&self, state: PointerState) -> Result<(), TransportError> {
        self.check()?;
        self.log.push(Sent::Pointer(state));
        Ok(())
    }

    fn send_key(&self, key: &RemoteKey, pressed: bool) -> Result<(), TransportError> {
        self.check()?;
        self.log.push(Sent::Key {
            keysym: key.keysym,
            pressed,
        });
        Ok(())
    }

    fn send_secure_attention(&self) -> Result<(), TransportError> {
        self.check()?;
        if !self.capabilities.native_secure_attention {
            return Err(TransportError::Unsupported("secure attention"));
        }
        self.log.push(Sent::SecureAttention);
        Ok(())
    }

    fn send_clipboard(&self, mime: &str, blobs: &[String]) -> Result<(), TransportError> {
        self.check()?;
        self.log.push(Sent::Clipboard {
            mime: mime.to_string(),
            blobs: blobs.to_vec(),
        });
        Ok(())
    }

    fn send_size(&self, size: Size) -> Result<(), TransportError> {
        self.check()?;
        self.log.push(Sent::Size(size));
        Ok(())
    }

    fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

/// Test-side view of one connection handed out by [`MockDisplay`]
#[derive(Clone)]
pub struct MockConnection {
    pub target: TransportTarget,
    pub log: SentLog,
    pub events: mpsc::UnboundedSender<TransportEvent>,
    pub disconnected: Arc<AtomicBool>,
}

impl MockConnection {
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Mock host services
// ============================================================================

#[derive(Default)]
pub struct MockDisplay {
    pub capabilities: Mutex<TransportCapabilities>,
    pub code_space: Mutex<Option<KeyCodeSpace>>,
    pub connect_delay: Mutex<Duration>,
    pub fail_with: Mutex<Option<String>>,
    pub connections: Mutex<Vec<MockConnection>>,
}

impl MockDisplay {
    pub fn connection(&self, index: usize) -> Option<MockConnection> {
        self.connections.lock().get(index).cloned()
    }

    pub fn last(&self) -> Option<MockConnection> {
        self.connections.lock().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.connections.lock().len()
    }
}

#[async_trait]
impl DisplayTransportFactory for MockDisplay {
    async fn connect(&self, target: TransportTarget) -> Result<TransportConnection, TransportError> {
        let delay = *self.connect_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.fail_with.lock().clone() {
            return Err(TransportError::Connect(message));
        }

        let code_space = self.code_space.lock().unwrap_or(match target {
            TransportTarget::Relay { .. } => KeyCodeSpace::KeysymWithCode,
            TransportTarget::Gateway { .. } => KeyCodeSpace::Keysym,
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let log = SentLog::default();
        let disconnected = Arc::new(AtomicBool::new(false));

        self.connections.lock().push(MockConnection {
            target,
            log: log.clone(),
            events: tx,
            disconnected: Arc::clone(&disconnected),
        });

        Ok(TransportConnection {
            transport: Box::new(RecordingTransport {
                capabilities: *self.capabilities.lock(),
                code_space,
                log,
                disconnected,
            }),
            events: rx,
        })
    }
}

#[derive(Default)]
pub struct MockRelay {
    pub starts: Mutex<Vec<SessionId>>,
    pub stops: Mutex<Vec<SessionId>>,
    /// Ports currently running, by owning session
    pub running: Mutex<Vec<(SessionId, u16)>>,
    pub start_delay: Mutex<Duration>,
    pub fail: AtomicBool,
    next_port: AtomicUsize,
}

impl MockRelay {
    pub fn stop_count(&self, session: SessionId) -> usize {
        self.stops.lock().iter().filter(|s| **s == session).count()
    }

    pub fn start_count(&self, session: SessionId) -> usize {
        self.starts.lock().iter().filter(|s| **s == session).count()
    }

    pub fn running_ports(&self, session: SessionId) -> Vec<u16> {
        self.running
            .lock()
            .iter()
            .filter(|(s, _)| *s == session)
            .map(|(_, port)| *port)
            .collect()
    }
}

#[async_trait]
impl RelayService for MockRelay {
    async fn start(
        &self,
        session: SessionId,
        _params: &ConnectionParams,
    ) -> Result<RelayEndpoint, HostError> {
        let delay = *self.start_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.starts.lock().push(session);
        if self.fail.load(Ordering::SeqCst) {
            return Err(HostError::Failed("no free relay ports".to_string()));
        }
        let port = 40000 + self.next_port.fetch_add(1, Ordering::SeqCst) as u16;
        self.running.lock().push((session, port));
        Ok(RelayEndpoint {
            port,
            resolved_secret: None,
        })
    }

    async fn stop(&self, session: SessionId, port: Option<u16>) -> Result<(), HostError> {
        self.stops.lock().push(session);
        if let Some(port) = port {
            self.running.lock().retain(|entry| *entry != (session, port));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MockTokens {
    issued: AtomicUsize,
}

#[async_trait]
impl GatewayTokenService for MockTokens {
    async fn generate_session_token(
        &self,
        _params: &ConnectionParams,
    ) -> Result<SessionToken, HostError> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(SessionToken(format!("token-{n}")))
    }
}

pub struct FixedGateway(pub GatewayAddress);

#[async_trait]
impl GatewayConfigStore for FixedGateway {
    async fn gateway_address(&self) -> Result<GatewayAddress, HostError> {
        Ok(self.0.clone())
    }

    async fn set_gateway_address(&self, _address: GatewayAddress) -> Result<(), HostError> {
        Err(HostError::Unavailable("read-only".to_string()))
    }
}

#[derive(Default)]
pub struct MockTextSessions {
    pub writes: Mutex<Vec<Vec<u8>>>,
    pub resizes: Mutex<Vec<(u16, u16)>>,
    pub disconnects: AtomicUsize,
    pub senders: Mutex<Vec<mpsc::UnboundedSender<TextSessionEvent>>>,
}

impl MockTextSessions {
    pub fn written(&self) -> Vec<u8> {
        self.writes.lock().concat()
    }
}

#[async_trait]
impl TextSessionService for MockTextSessions {
    async fn connect(&self, _params: &ConnectionParams) -> Result<TextSessionHandle, HostError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = format!("text-{}", self.senders.lock().len());
        self.senders.lock().push(tx);
        Ok(TextSessionHandle { id, events: rx })
    }

    async fn write(&self, _id: &str, data: Vec<u8>) -> Result<(), HostError> {
        self.writes.lock().push(data);
        Ok(())
    }

    async fn resize(&self, _id: &str, cols: u16, rows: u16) -> Result<(), HostError> {
        self.resizes.lock().push((cols, rows));
        Ok(())
    }

    async fn disconnect(&self, _id: &str) -> Result<(), HostError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockPreview {
    pub captures: AtomicUsize,
    pub offline: AtomicBool,
}

#[async_trait]
impl PreviewService for MockPreview {
    async fn capture(&self, _params: &ConnectionParams) -> Result<Size, HostError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            Err(HostError::Unavailable("host unreachable".to_string()))
        } else {
            Ok(Size::new(1280, 800))
        }
    }
}

/// A host bridge made of mocks, with direct access to each one
pub struct MockHost {
    pub display: Arc<MockDisplay>,
    pub relay: Arc<MockRelay>,
    pub tokens: Arc<MockTokens>,
    pub text: Arc<MockTextSessions>,
    pub preview: Arc<MockPreview>,
    pub bridge: HostBridge,
}

impl MockHost {
    /// Mocks with every transport capability turned on
    pub fn new() -> Self {
        let display = Arc::new(MockDisplay::default());
        *display.capabilities.lock() = TransportCapabilities {
            dynamic_resize: true,
            native_secure_attention: false,
            clipboard: true,
        };
        let relay = Arc::new(MockRelay::default());
        let tokens = Arc::new(MockTokens::default());
        let text = Arc::new(MockTextSessions::default());
        let preview = Arc::new(MockPreview::default());
        let bridge = HostBridge {
            config: Arc::new(FixedGateway(GatewayAddress::new("gw.test", 4822))),
            tokens: tokens.clone(),
            relay: relay.clone(),
            text_sessions: text.clone(),
            preview: preview.clone(),
            display: display.clone(),
        };
        Self {
            display,
            relay,
            tokens,
            text,
            preview,
            bridge,
        }
    }

    pub fn session(&self, params: ConnectionParams) -> Session {
        self.session_with(params, Config::default(), MemoryClipboard::new())
    }

    pub fn session_with(
        &self,
        params: ConnectionParams,
        config: Config,
        clipboard: MemoryClipboard,
    ) -> Session {
        Session::new(
            params,
            self.bridge.clone(),
            Arc::new(config),
            SharedClipboard::new(clipboard),
            Handle::current(),
        )
    }

    pub fn registry(&self) -> SessionRegistry {
        SessionRegistry::new(
            self.bridge.clone(),
            Arc::new(Config::default()),
            SharedClipboard::new(MemoryClipboard::new()),
            Handle::current(),
        )
    }
}

// ============================================================================
// Surfaces and waiting
// ============================================================================

#[derive(Default)]
pub struct RecordingSurface {
    pub scales: Mutex<Vec<f64>>,
    pub output: Mutex<Vec<u8>>,
}

impl RecordingSurface {
    pub fn last_scale(&self) -> Option<f64> {
        self.scales.lock().last().copied()
    }
}

impl RenderSurface for RecordingSurface {
    fn apply_scale(&self, scale: f64) {
        self.scales.lock().push(scale);
    }

    fn text_output(&self, data: &[u8]) {
        self.output.lock().extend_from_slice(data);
    }
}

/// Let spawned tasks run without advancing time
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Wait until the session reaches `status` (bounded, works with paused time)
pub async fn wait_for_status(session: &Session, status: SessionStatus) {
    let mut rx = session.subscribe_status();
    let reached = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if *rx.borrow_and_update() == status {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    })
    .await;
    assert!(
        reached.is_ok(),
        "session never reached {status}, stuck at {}",
        session.status()
    );
}

/// Connect `session` and drive it to `Connected` through the mock transport
pub async fn connect_and_open(host: &MockHost, session: &Session) -> MockConnection {
    session.connect().expect("connect");
    settle().await;
    let connection = host.display.last().expect("transport created");
    connection.emit(TransportEvent::State(
        par_remote::transport::RemoteState::Connected,
    ));
    wait_for_status(session, SessionStatus::Connected).await;
    connection
}

pub fn input_of(session: &Session) -> InputBridge {
    session.input().clone()
}
