//! Host bridge: the services this layer consumes from the surrounding
//! application.
//!
//! Every service is an object-safe async trait so the application (or a test)
//! can supply its own implementation. Two concrete implementations ship here:
//! [`ConfigGatewayStore`] (YAML-backed gateway address) and
//! [`TcpRelayService`] (loopback TCP relay).

pub mod config_store;
pub mod tcp_relay;

pub use config_store::ConfigGatewayStore;
pub use tcp_relay::{RelayStats, TcpRelay, TcpRelayService};

use crate::session::{ConnectionParams, SessionId};
use crate::transport::DisplayTransportFactory;
use crate::viewport::Size;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors returned by host services
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Address of the remote-desktop gateway
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GatewayAddress {
    pub host: String,
    pub port: u16,
}

impl GatewayAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for GatewayAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for GatewayAddress {
    type Err = HostError;

    /// Parse `host:port` (IPv6 hosts in brackets: `[::1]:4822`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| HostError::InvalidArgument(format!("expected host:port, got '{s}'")))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(HostError::InvalidArgument(format!("missing host in '{s}'")));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| HostError::InvalidArgument(format!("invalid port in '{s}'")))?;
        if port == 0 {
            return Err(HostError::InvalidArgument("port must be nonzero".to_string()));
        }
        Ok(Self::new(host, port))
    }
}

/// Short-lived gateway authorisation token.
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(pub String);

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// A running local relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEndpoint {
    /// Loopback port the display transport should connect to
    pub port: u16,
    /// Secret the relay resolved for the target, if any
    pub resolved_secret: Option<String>,
}

/// Events from a terminal-mode text session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSessionEvent {
    Data(Vec<u8>),
    Closed,
}

/// Handle returned by [`TextSessionService::connect`]
#[derive(Debug)]
pub struct TextSessionHandle {
    pub id: String,
    pub events: mpsc::UnboundedReceiver<TextSessionEvent>,
}

#[async_trait]
pub trait GatewayConfigStore: Send + Sync {
    async fn gateway_address(&self) -> Result<GatewayAddress, HostError>;

    async fn set_gateway_address(&self, address: GatewayAddress) -> Result<(), HostError>;
}

#[async_trait]
pub trait GatewayTokenService: Send + Sync {
    async fn generate_session_token(
        &self,
        params: &ConnectionParams,
    ) -> Result<SessionToken, HostError>;
}

/// Local relay allocation.
///
/// A session can hold several relays over its lifetime, so `stop` names the
/// port returned by the `start` it releases. `None` releases an attempt whose
/// `start` failed and must not touch any running relay.
#[async_trait]
pub trait RelayService: Send + Sync {
    async fn start(
        &self,
        session: SessionId,
        params: &ConnectionParams,
    ) -> Result<RelayEndpoint, HostError>;

    async fn stop(&self, session: SessionId, port: Option<u16>) -> Result<(), HostError>;
}

#[async_trait]
pub trait TextSessionService: Send + Sync {
    async fn connect(&self, params: &ConnectionParams) -> Result<TextSessionHandle, HostError>;

    async fn write(&self, id: &str, data: Vec<u8>) -> Result<(), HostError>;

    async fn resize(&self, id: &str, cols: u16, rows: u16) -> Result<(), HostError>;

    async fn disconnect(&self, id: &str) -> Result<(), HostError>;
}

/// Thumbnail capture for sessions that are not live
#[async_trait]
pub trait PreviewService: Send + Sync {
    /// Capture a preview, returning the remote display size it was taken at
    async fn capture(&self, params: &ConnectionParams) -> Result<Size, HostError>;
}

/// All host services, cheaply cloneable
#[derive(Clone)]
pub struct HostBridge {
    pub config: Arc<dyn GatewayConfigStore>,
    pub tokens: Arc<dyn GatewayTokenService>,
    pub relay: Arc<dyn RelayService>,
    pub text_sessions: Arc<dyn TextSessionService>,
    pub preview: Arc<dyn PreviewService>,
    pub display: Arc<dyn DisplayTransportFactory>,
}

impl fmt::Debug for HostBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBridge").finish_non_exhaustive()
    }
}
