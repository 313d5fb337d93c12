//! Session registry: every open session plus which one is active.

mod connect_guard;

pub use connect_guard::ConnectGuard;

use crate::clipboard::SharedClipboard;
use crate::host::HostBridge;
use crate::input::{InputOutcome, KeyboardCapture};
use crate::session::{ConnectionParams, Session, SessionError, SessionId};
use par_remote_config::Config;
use par_remote_input::KeyInput;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Holds N concurrent sessions in open order.
///
/// The active session owns the keyboard capture. Closing a session never
/// touches any other one.
pub struct SessionRegistry {
    /// All sessions, in open order
    sessions: Vec<Session>,
    /// Currently active session
    active_session_id: Option<SessionId>,
    capture: KeyboardCapture,
    guard: ConnectGuard,
    host: HostBridge,
    config: Arc<Config>,
    clipboard: SharedClipboard,
    runtime: Handle,
}

impl SessionRegistry {
    pub fn new(
        host: HostBridge,
        config: Arc<Config>,
        clipboard: SharedClipboard,
        runtime: Handle,
    ) -> Self {
        let guard = ConnectGuard::new(Duration::from_millis(config.session.connect_guard_ms));
        Self {
            sessions: Vec::new(),
            active_session_id: None,
            capture: KeyboardCapture::new(),
            guard,
            host,
            config,
            clipboard,
            runtime,
        }
    }

    /// Open and connect a session, making it active.
    ///
    /// A second request for the same target inside the guard window returns
    /// the session the first one opened.
    pub fn open(&mut self, params: ConnectionParams) -> Result<SessionId, RegistryError> {
        let target = params.target_key();
        let now = Instant::now();
        if let Some(existing) = self.guard.check(&target, now)
            && self.index_of(existing).is_some()
        {
            log::debug!("Duplicate open for {} collapsed into {}", target, existing);
            return Ok(existing);
        }

        let session = Session::new(
            params,
            self.host.clone(),
            Arc::clone(&self.config),
            self.clipboard.clone(),
            self.runtime.clone(),
        );
        // On failure the session is dropped, which tears it down
        session.connect()?;

        let id = session.id();
        self.guard.record(target, id, now);
        self.sessions.push(session);
        self.activate(id);

        log::info!("Opened session {} (total: {})", id, self.sessions.len());
        Ok(id)
    }

    /// Tear down and remove one session
    pub fn close(&mut self, id: SessionId) -> Result<(), RegistryError> {
        let Some(idx) = self.index_of(id) else {
            log::error!("close: unknown session {}", id);
            return Err(RegistryError::UnknownSession(id));
        };

        log::info!("Closing session {} (index {})", id, idx);
        let session = self.sessions.remove(idx);
        self.capture.release(id);
        self.guard.forget(id);
        session.teardown();

        if self.active_session_id == Some(id) {
            if self.sessions.is_empty() {
                self.active_session_id = None;
            } else {
                // Prefer the session at the same index (or previous if at end)
                let new_idx = idx.min(self.sessions.len() - 1);
                let next = self.sessions[new_idx].id();
                self.activate(next);
            }
        }
        Ok(())
    }

    /// Tear down every session
    pub fn close_all(&mut self) {
        let count = self.sessions.len();
        for session in self.sessions.drain(..) {
            self.capture.release(session.id());
            self.guard.forget(session.id());
            // Teardown is idempotent, so sessions already closed remotely are fine
            session.teardown();
        }
        self.active_session_id = None;
        if count > 0 {
            log::info!("Closed all {} sessions", count);
        }
    }

    /// Show `id` and give it the keyboard
    pub fn switch_to(&mut self, id: SessionId) -> Result<(), RegistryError> {
        if self.index_of(id).is_none() {
            log::error!("switch_to: unknown session {}", id);
            return Err(RegistryError::UnknownSession(id));
        }
        self.activate(id);
        Ok(())
    }

    /// Activate the next session, wrapping around
    pub fn next_session(&mut self) {
        if let Some(next) = self.neighbor(1) {
            self.activate(next);
        }
    }

    /// Activate the previous session, wrapping around
    pub fn prev_session(&mut self) {
        if let Some(prev) = self.neighbor(-1) {
            self.activate(prev);
        }
    }

    /// Explicitly restart a session's connection
    pub fn reconnect(&mut self, id: SessionId) -> Result<(), RegistryError> {
        let session = self
            .session(id)
            .ok_or(RegistryError::UnknownSession(id))?;
        session.reconnect()?;
        Ok(())
    }

    /// Route a raw key event to the session that owns the keyboard
    pub fn handle_key(&self, input: &KeyInput) -> InputOutcome {
        self.capture.dispatch(input)
    }

    pub fn capture_owner(&self) -> Option<SessionId> {
        self.capture.owner()
    }

    pub fn active_session_id(&self) -> Option<SessionId> {
        self.active_session_id
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active_session_id.and_then(|id| self.session(id))
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(Session::id).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn index_of(&self, id: SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| s.id() == id)
    }

    fn neighbor(&self, step: isize) -> Option<SessionId> {
        if self.sessions.len() < 2 {
            return None;
        }
        let current = self.active_session_id.and_then(|id| self.index_of(id))?;
        let len = self.sessions.len() as isize;
        let idx = (current as isize + step).rem_euclid(len) as usize;
        Some(self.sessions[idx].id())
    }

    fn activate(&mut self, id: SessionId) {
        let Some(idx) = self.index_of(id) else {
            return;
        };
        self.active_session_id = Some(id);
        self.capture
            .acquire(id, self.sessions[idx].input().clone());
        log::debug!("Active session is now {}", id);
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.ids())
            .field("active_session_id", &self.active_session_id)
            .finish()
    }
}
