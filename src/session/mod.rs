//! Remote sessions: identity, connection parameters and lifecycle.

mod lifecycle;
mod live;
mod state;

pub use lifecycle::Session;
pub use live::LiveTransport;
pub use state::SessionStatus;

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Stable session identifier, kept across reconnects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolKind {
    Vnc,
    Rdp,
    Ssh,
}

impl ProtocolKind {
    pub fn default_port(self) -> u16 {
        match self {
            ProtocolKind::Vnc => 5900,
            ProtocolKind::Rdp => 3389,
            ProtocolKind::Ssh => 22,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProtocolKind::Vnc => "vnc",
            ProtocolKind::Rdp => "rdp",
            ProtocolKind::Ssh => "ssh",
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a session reaches its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionRoute {
    /// Through the remote-desktop gateway with a session token
    Gateway,
    /// Through a local TCP relay (VNC only)
    Relay,
    /// Terminal-mode text session (SSH only)
    TextSession,
}

/// Everything needed to open one session
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub protocol: ProtocolKind,
    pub route: ConnectionRoute,
    pub host: String,
    /// `None` means the protocol's default port
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub domain: Option<String>,
    /// Overrides the configured view-only default
    pub view_only: Option<bool>,
}

impl ConnectionParams {
    pub fn new(protocol: ProtocolKind, route: ConnectionRoute, host: impl Into<String>) -> Self {
        Self {
            protocol,
            route,
            host: host.into(),
            port: None,
            username: None,
            password: None,
            domain: None,
            view_only: None,
        }
    }

    /// Direct VNC through a local relay
    pub fn vnc_relay(host: impl Into<String>, port: u16) -> Self {
        Self::new(ProtocolKind::Vnc, ConnectionRoute::Relay, host).with_port(port)
    }

    /// Any protocol through the gateway
    pub fn gateway(protocol: ProtocolKind, host: impl Into<String>) -> Self {
        Self::new(protocol, ConnectionRoute::Gateway, host)
    }

    /// Terminal-mode SSH
    pub fn ssh_text(host: impl Into<String>) -> Self {
        Self::new(ProtocolKind::Ssh, ConnectionRoute::TextSession, host)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_view_only(mut self, view_only: bool) -> Self {
        self.view_only = Some(view_only);
        self
    }

    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    /// Identity of the remote target, used to collapse duplicate opens
    pub fn target_key(&self) -> String {
        format!(
            "{}://{}@{}:{}/{:?}",
            self.protocol,
            self.username.as_deref().unwrap_or(""),
            self.host.trim().to_ascii_lowercase(),
            self.effective_port(),
            self.route
        )
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.host.trim().is_empty() {
            return Err(SessionError::MissingTarget);
        }
        let supported = match self.route {
            ConnectionRoute::Gateway => true,
            ConnectionRoute::Relay => self.protocol == ProtocolKind::Vnc,
            ConnectionRoute::TextSession => self.protocol == ProtocolKind::Ssh,
        };
        if !supported {
            return Err(SessionError::UnsupportedRoute {
                protocol: self.protocol,
                route: self.route,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("protocol", &self.protocol)
            .field("route", &self.route)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("domain", &self.domain)
            .field("view_only", &self.view_only)
            .finish()
    }
}

/// Session-level failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no target host given")]
    MissingTarget,

    #[error("{protocol} cannot use the {route:?} route")]
    UnsupportedRoute {
        protocol: ProtocolKind,
        route: ConnectionRoute,
    },

    #[error("session has been torn down")]
    TornDown,

    #[error("relay allocation failed: {0}")]
    Relay(String),

    #[error("gateway setup failed: {0}")]
    Gateway(String),

    #[error("text session failed: {0}")]
    TextSession(String),

    #[error("transport failed: {0}")]
    Transport(String),
}
