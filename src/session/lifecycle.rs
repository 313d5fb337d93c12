//! Session lifecycle: connect, event pump, reconnect and teardown.
//!
//! Lock order is state -> transport slot. Neither lock is held across an
//! `.await`, and transport/relay release happens after the state lock is
//! dropped.

use super::live::{LiveTransport, TransportSlot};
use super::{ConnectionParams, ConnectionRoute, SessionError, SessionId, SessionStatus};
use crate::clipboard::{ClipboardBridge, SharedClipboard};
use crate::host::{HostBridge, RelayService};
use crate::input::{InputBridge, InputMode};
use crate::transport::{
    RemoteState, RemoteTransport, TransportConnection, TransportEvent, TransportTarget,
    text_session,
};
use crate::viewport::{RenderSurface, ViewportNegotiator};
use par_remote_config::Config;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Cancellation flag for one connect attempt
#[derive(Debug, Clone, Default)]
struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A running relay. Dropping the lease stops it, so it is released exactly once.
///
/// The stop names this attempt's port, so a late release after a reconnect
/// never hits the relay of the next attempt.
struct RelayLease {
    session: SessionId,
    port: Option<u16>,
    relay: Arc<dyn RelayService>,
    runtime: Handle,
}

impl Drop for RelayLease {
    fn drop(&mut self) {
        let relay = Arc::clone(&self.relay);
        let session = self.session;
        let port = self.port;
        self.runtime.spawn(async move {
            if let Err(e) = relay.stop(session, port).await {
                log::warn!("Failed to stop relay for session {}: {}", session, e);
            }
        });
    }
}

struct SessionState {
    status: SessionStatus,
    last_error: Option<String>,
    relay: Option<RelayLease>,
    cancel: Option<CancelToken>,
    event_task: Option<JoinHandle<()>>,
    surface: Option<Arc<dyn RenderSurface>>,
    /// Initial fit already scheduled for this attempt
    fitted: bool,
    torn_down: bool,
}

/// Resources taken out of a session, released once no lock is held
#[derive(Default)]
struct Released {
    transport: Option<Box<dyn RemoteTransport>>,
    relay: Option<RelayLease>,
    event_task: Option<JoinHandle<()>>,
}

impl Released {
    fn release(self, abort_pump: bool) {
        if let Some(task) = self.event_task
            && abort_pump
        {
            task.abort();
        }
        if let Some(transport) = self.transport {
            transport.disconnect();
        }
        drop(self.relay);
    }
}

struct SessionCore {
    id: SessionId,
    params: ConnectionParams,
    host: HostBridge,
    config: Arc<Config>,
    runtime: Handle,
    slot: TransportSlot,
    state: Mutex<SessionState>,
    status_tx: watch::Sender<SessionStatus>,
    viewport: ViewportNegotiator,
    input: InputBridge,
    clipboard: ClipboardBridge,
}

/// One remote session.
///
/// Owns its transport and relay exclusively. Dropping the session tears it
/// down.
pub struct Session {
    core: Arc<SessionCore>,
}

impl Session {
    pub fn new(
        params: ConnectionParams,
        host: HostBridge,
        config: Arc<Config>,
        clipboard: SharedClipboard,
        runtime: Handle,
    ) -> Self {
        let id = SessionId::new();
        let slot: TransportSlot = Arc::new(Mutex::new(None));
        let live = LiveTransport::new(&slot);

        let viewport =
            ViewportNegotiator::new(config.viewport.clone(), live.clone(), runtime.clone());
        let mode = if params
            .view_only
            .unwrap_or(config.input.view_only_by_default)
        {
            InputMode::ViewOnly
        } else {
            InputMode::Interactive
        };
        let input = InputBridge::new(config.input.clone(), viewport.clone(), live.clone(), mode);
        let clipboard = ClipboardBridge::new(config.clipboard.clone(), clipboard, live);
        let (status_tx, _) = watch::channel(SessionStatus::Idle);

        log::info!("Created session {} for {} {}", id, params.protocol, params.host);

        Self {
            core: Arc::new(SessionCore {
                id,
                params,
                host,
                config,
                runtime,
                slot,
                state: Mutex::new(SessionState {
                    status: SessionStatus::Idle,
                    last_error: None,
                    relay: None,
                    cancel: None,
                    event_task: None,
                    surface: None,
                    fitted: false,
                    torn_down: false,
                }),
                status_tx,
                viewport,
                input,
                clipboard,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.core.id
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.core.params
    }

    pub fn status(&self) -> SessionStatus {
        self.core.state.lock().status
    }

    /// Message from the last failed attempt
    pub fn last_error(&self) -> Option<String> {
        self.core.state.lock().last_error.clone()
    }

    /// Watch status changes
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.core.status_tx.subscribe()
    }

    pub fn has_transport(&self) -> bool {
        self.core.slot.lock().is_some()
    }

    pub fn has_relay(&self) -> bool {
        self.core.state.lock().relay.is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        self.core.state.lock().torn_down
    }

    pub fn live_transport(&self) -> LiveTransport {
        LiveTransport::new(&self.core.slot)
    }

    pub fn viewport(&self) -> &ViewportNegotiator {
        &self.core.viewport
    }

    pub fn input(&self) -> &InputBridge {
        &self.core.input
    }

    pub fn clipboard(&self) -> &ClipboardBridge {
        &self.core.clipboard
    }

    pub fn input_mode(&self) -> InputMode {
        self.core.input.mode()
    }

    pub fn set_input_mode(&self, mode: InputMode) {
        self.core.input.set_mode(mode);
    }

    /// Flip between view-only and interactive; returns the new mode
    pub fn toggle_view_only(&self) -> InputMode {
        let next = match self.core.input.mode() {
            InputMode::ViewOnly => InputMode::Interactive,
            InputMode::Interactive => InputMode::ViewOnly,
        };
        self.core.input.set_mode(next);
        next
    }

    /// Bind the render surface for this session
    pub fn attach_surface(&self, surface: Arc<dyn RenderSurface>) {
        self.core.state.lock().surface = Some(Arc::clone(&surface));
        self.core.viewport.attach(surface);
    }

    pub fn detach_surface(&self) {
        self.core.state.lock().surface = None;
        self.core.viewport.detach();
    }

    /// Start a connect attempt. No-op while one is running or established.
    pub fn connect(&self) -> Result<(), SessionError> {
        self.core.start_connect()
    }

    /// Release the current attempt and connect again with the same parameters
    pub fn reconnect(&self) -> Result<(), SessionError> {
        let released = {
            let mut state = self.core.state.lock();
            if state.torn_down {
                return Err(SessionError::TornDown);
            }
            if let Some(cancel) = state.cancel.take() {
                cancel.cancel();
            }
            let released = self.core.take_resources(&mut state);
            if state.status.is_active() {
                self.core.transition(&mut state, SessionStatus::Disconnecting);
                self.core.transition(&mut state, SessionStatus::Disconnected);
            }
            released
        };
        released.release(true);
        self.core.clipboard.reset();
        log::info!("Reconnecting session {}", self.core.id);
        self.core.start_connect()
    }

    /// Release everything this session holds. Safe to call any number of times.
    pub fn teardown(&self) {
        self.core.teardown();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.core.teardown();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.core.id)
            .field("params", &self.core.params)
            .field("status", &self.status())
            .finish()
    }
}

impl SessionCore {
    fn transition(&self, state: &mut SessionState, next: SessionStatus) -> bool {
        if state.status == next {
            return false;
        }
        if !state.status.can_transition_to(next) {
            log::debug!(
                "Session {} ignoring transition {} -> {}",
                self.id,
                state.status,
                next
            );
            return false;
        }
        log::info!("Session {}: {} -> {}", self.id, state.status, next);
        state.status = next;
        self.status_tx.send_replace(next);
        true
    }

    fn take_resources(&self, state: &mut SessionState) -> Released {
        Released {
            transport: self.slot.lock().take(),
            relay: state.relay.take(),
            event_task: state.event_task.take(),
        }
    }

    fn start_connect(self: &Arc<Self>) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        if state.torn_down {
            return Err(SessionError::TornDown);
        }
        if state.status.is_active() {
            log::debug!("Session {} already {}", self.id, state.status);
            return Ok(());
        }
        if let Err(e) = self.params.validate() {
            state.last_error = Some(e.to_string());
            self.transition(&mut state, SessionStatus::Connecting);
            self.transition(&mut state, SessionStatus::Error);
            return Err(e);
        }

        let cancel = CancelToken::default();
        state.cancel = Some(cancel.clone());
        state.last_error = None;
        state.fitted = false;
        self.transition(&mut state, SessionStatus::Connecting);
        drop(state);

        let core = Arc::clone(self);
        self.runtime.spawn(async move {
            match core.establish(&cancel).await {
                Ok(Some(connection)) => core.install(connection, &cancel),
                Ok(None) => log::debug!("Session {} connect cancelled", core.id),
                Err(e) => core.fail_attempt(e.to_string(), &cancel),
            }
        });
        Ok(())
    }

    /// Acquire the relay (if any) and open the transport.
    ///
    /// `Ok(None)` when the attempt was cancelled; anything acquired so far
    /// has been released.
    async fn establish(
        &self,
        cancel: &CancelToken,
    ) -> Result<Option<TransportConnection>, SessionError> {
        let params = &self.params;
        let connection = match params.route {
            ConnectionRoute::Relay => {
                let started = self.host.relay.start(self.id, params).await;
                // Held from here so a partial or late relay is always stopped
                let mut lease = RelayLease {
                    session: self.id,
                    port: None,
                    relay: Arc::clone(&self.host.relay),
                    runtime: self.runtime.clone(),
                };
                let endpoint = started.map_err(|e| SessionError::Relay(e.to_string()))?;
                lease.port = Some(endpoint.port);
                if cancel.is_cancelled() {
                    return Ok(None);
                }
                {
                    let mut state = self.state.lock();
                    if cancel.is_cancelled() {
                        return Ok(None);
                    }
                    state.relay = Some(lease);
                }
                log::debug!("Session {} relay on port {}", self.id, endpoint.port);
                self.host
                    .display
                    .connect(TransportTarget::Relay {
                        protocol: params.protocol,
                        port: endpoint.port,
                        secret: endpoint.resolved_secret,
                    })
                    .await
                    .map_err(|e| SessionError::Transport(e.to_string()))?
            }
            ConnectionRoute::Gateway => {
                let token = self
                    .host
                    .tokens
                    .generate_session_token(params)
                    .await
                    .map_err(|e| SessionError::Gateway(e.to_string()))?;
                let address = self
                    .host
                    .config
                    .gateway_address()
                    .await
                    .map_err(|e| SessionError::Gateway(e.to_string()))?;
                if cancel.is_cancelled() {
                    return Ok(None);
                }
                self.host
                    .display
                    .connect(TransportTarget::Gateway {
                        protocol: params.protocol,
                        address,
                        token,
                    })
                    .await
                    .map_err(|e| SessionError::Transport(e.to_string()))?
            }
            ConnectionRoute::TextSession => text_session::connect(
                Arc::clone(&self.host.text_sessions),
                params,
                self.config.text_session.clone(),
            )
            .await
            .map_err(|e| SessionError::TextSession(e.to_string()))?,
        };

        if cancel.is_cancelled() {
            log::debug!("Session {} discarding late transport", self.id);
            connection.transport.disconnect();
            return Ok(None);
        }
        Ok(Some(connection))
    }

    fn install(self: &Arc<Self>, connection: TransportConnection, cancel: &CancelToken) {
        let TransportConnection { transport, events } = connection;
        let mut state = self.state.lock();
        if cancel.is_cancelled() || state.torn_down {
            drop(state);
            transport.disconnect();
            return;
        }
        *self.slot.lock() = Some(transport);
        let weak = Arc::downgrade(self);
        state.event_task = Some(self.runtime.spawn(pump_events(weak, events)));
        log::info!("Session {} transport attached", self.id);
    }

    fn fail_attempt(&self, message: String, cancel: &CancelToken) {
        if cancel.is_cancelled() {
            log::debug!("Session {} late failure ignored: {}", self.id, message);
            return;
        }
        self.fail(message, false);
    }

    /// Move to `Error` and release the attempt's resources
    fn fail(&self, message: String, from_pump: bool) {
        let released = {
            let mut state = self.state.lock();
            if state.torn_down {
                return;
            }
            log::error!("Session {} failed: {}", self.id, message);
            state.last_error = Some(message);
            self.transition(&mut state, SessionStatus::Error);
            if let Some(cancel) = state.cancel.take() {
                cancel.cancel();
            }
            self.take_resources(&mut state)
        };
        released.release(!from_pump);
        self.viewport.cancel_timers();
    }

    /// Remote side closed: release resources, session stays listed
    fn remote_closed(&self) {
        let released = {
            let mut state = self.state.lock();
            if state.torn_down || state.status.is_terminal() {
                return;
            }
            if let Some(cancel) = state.cancel.take() {
                cancel.cancel();
            }
            self.transition(&mut state, SessionStatus::Disconnecting);
            let released = self.take_resources(&mut state);
            self.transition(&mut state, SessionStatus::Disconnected);
            released
        };
        log::info!("Session {} closed by remote", self.id);
        released.release(false);
        self.viewport.cancel_timers();
    }

    fn on_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::State(RemoteState::Waiting) => {
                let mut state = self.state.lock();
                self.transition(&mut state, SessionStatus::Waiting);
            }
            TransportEvent::State(RemoteState::Connected) => {
                let first = {
                    let mut state = self.state.lock();
                    self.transition(&mut state, SessionStatus::Connected);
                    !std::mem::replace(&mut state.fitted, true)
                };
                if first {
                    self.viewport.schedule_initial_fit();
                }
            }
            TransportEvent::DisplayResized(size) => self.viewport.on_display_resized(size),
            TransportEvent::ClipboardStart { stream, mime } => {
                self.clipboard.on_stream_start(stream, &mime)
            }
            TransportEvent::ClipboardBlob { stream, data } => self.clipboard.on_blob(stream, &data),
            TransportEvent::ClipboardEnd { stream } => {
                self.clipboard.on_stream_end(stream);
            }
            TransportEvent::Output(bytes) => {
                let surface = self.state.lock().surface.clone();
                if let Some(surface) = surface {
                    surface.text_output(&bytes);
                }
            }
            TransportEvent::Closed => self.remote_closed(),
            TransportEvent::Error(message) => self.fail(message, true),
        }
    }

    fn teardown(&self) {
        let released = {
            let mut state = self.state.lock();
            if state.torn_down {
                return;
            }
            state.torn_down = true;
            if let Some(cancel) = state.cancel.take() {
                cancel.cancel();
            }
            self.transition(&mut state, SessionStatus::Disconnecting);
            state.surface = None;
            self.take_resources(&mut state)
        };

        released.release(true);
        self.viewport.detach();
        self.clipboard.reset();

        let mut state = self.state.lock();
        self.transition(&mut state, SessionStatus::Disconnected);
        log::info!("Session {} torn down", self.id);
    }
}

async fn pump_events(core: Weak<SessionCore>, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
    while let Some(event) = events.recv().await {
        let Some(core) = core.upgrade() else {
            return;
        };
        let terminal = matches!(event, TransportEvent::Closed | TransportEvent::Error(_));
        core.on_event(event);
        if terminal {
            return;
        }
    }
    // Sender dropped without a Closed event
    if let Some(core) = core.upgrade() {
        core.remote_closed();
    }
}
