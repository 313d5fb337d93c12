//! Remote transport contract.
//!
//! A transport is the live protocol connection behind one session: it carries
//! pointer, key, clipboard and resize messages out, and emits
//! [`TransportEvent`]s in. The framebuffer wire encoding itself belongs to the
//! transport implementation; this layer only depends on the shapes below.
//!
//! Transports are created by a [`DisplayTransportFactory`] (host provided) or,
//! for terminal-mode SSH, by the [`text_session`] adapter.

pub mod text_session;

use crate::host::{GatewayAddress, SessionToken};
use crate::session::ProtocolKind;
use crate::viewport::Size;
use async_trait::async_trait;
use par_remote_input::{KeyCodeSpace, RemoteKey};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised by a transport
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport connect failed: {0}")]
    Connect(String),

    #[error("transport is closed")]
    Closed,

    #[error("operation not supported by this transport: {0}")]
    Unsupported(&'static str),

    #[error("failed to send: {0}")]
    Send(String),
}

/// What the remote side of a transport can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportCapabilities {
    /// Remote accepts resolution changes following the local container
    pub dynamic_resize: bool,
    /// Transport has a native Ctrl+Alt+Del primitive
    pub native_secure_attention: bool,
    /// Transport carries a clipboard channel
    pub clipboard: bool,
}

/// Remote connection progress reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteState {
    /// Gateway accepted the connection and is waiting on the target
    Waiting,
    /// First frame / handshake complete
    Connected,
}

/// Inbound events from a transport, delivered in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    State(RemoteState),
    /// Remote framebuffer size changed (or was reported for the first time)
    DisplayResized(Size),
    /// A clipboard stream opened
    ClipboardStart { stream: u32, mime: String },
    /// One base64 chunk of an open clipboard stream
    ClipboardBlob { stream: u32, data: String },
    /// End marker for a clipboard stream
    ClipboardEnd { stream: u32 },
    /// Raw output from a terminal-mode session
    Output(Vec<u8>),
    /// Remote side closed the connection
    Closed,
    /// Protocol or network failure
    Error(String),
}

/// Full pointer state in remote framebuffer coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerState {
    pub x: u32,
    pub y: u32,
    pub buttons: ButtonMask,
}

/// RFB-style button bit mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ButtonMask(pub u8);

impl ButtonMask {
    pub const NONE: ButtonMask = ButtonMask(0);
    pub const LEFT: ButtonMask = ButtonMask(1);
    pub const MIDDLE: ButtonMask = ButtonMask(1 << 1);
    pub const RIGHT: ButtonMask = ButtonMask(1 << 2);
    pub const SCROLL_UP: ButtonMask = ButtonMask(1 << 3);
    pub const SCROLL_DOWN: ButtonMask = ButtonMask(1 << 4);

    /// Mask bit for a winit mouse button, if it has one
    pub fn for_button(button: winit::event::MouseButton) -> Option<ButtonMask> {
        use winit::event::MouseButton;
        match button {
            MouseButton::Left => Some(Self::LEFT),
            MouseButton::Middle => Some(Self::MIDDLE),
            MouseButton::Right => Some(Self::RIGHT),
            _ => None,
        }
    }

    pub fn contains(self, other: ButtonMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Copy of this mask with `other` set or cleared
    pub fn with(self, other: ButtonMask, pressed: bool) -> ButtonMask {
        if pressed {
            ButtonMask(self.0 | other.0)
        } else {
            ButtonMask(self.0 & !other.0)
        }
    }
}

/// Outbound half of a live connection.
///
/// All methods are synchronous: implementations enqueue onto their own
/// writer. `disconnect` only starts the close; completion is reported as
/// [`TransportEvent::Closed`] on the event stream.
pub trait RemoteTransport: Send {
    fn capabilities(&self) -> TransportCapabilities;

    /// Key code space this transport expects
    fn code_space(&self) -> KeyCodeSpace;

    fn send_pointer(&self, state: PointerState) -> Result<(), TransportError>;

    fn send_key(&self, key: &RemoteKey, pressed: bool) -> Result<(), TransportError>;

    fn send_secure_attention(&self) -> Result<(), TransportError> {
        Err(TransportError::Unsupported("secure attention"))
    }

    /// Send one clipboard stream made of base64 blobs
    fn send_clipboard(&self, mime: &str, blobs: &[String]) -> Result<(), TransportError>;

    /// Ask the remote display to adopt `size`
    fn send_size(&self, size: Size) -> Result<(), TransportError>;

    fn disconnect(&self);
}

/// Where a display transport should connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportTarget {
    /// Local relay endpoint bridging to the remote target
    Relay {
        protocol: ProtocolKind,
        port: u16,
        secret: Option<String>,
    },
    /// Gateway-mediated connection authorised by a short-lived token
    Gateway {
        protocol: ProtocolKind,
        address: GatewayAddress,
        token: SessionToken,
    },
}

/// A freshly opened connection: the outbound handle plus its event stream
pub struct TransportConnection {
    pub transport: Box<dyn RemoteTransport>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl std::fmt::Debug for TransportConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConnection")
            .field("capabilities", &self.transport.capabilities())
            .finish_non_exhaustive()
    }
}

/// Creates framebuffer transports (RFB over the relay, or the gateway protocol)
#[async_trait]
pub trait DisplayTransportFactory: Send + Sync {
    async fn connect(&self, target: TransportTarget) -> Result<TransportConnection, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_mask_set_and_clear() {
        let mask = ButtonMask::NONE
            .with(ButtonMask::LEFT, true)
            .with(ButtonMask::RIGHT, true);
        assert_eq!(mask, ButtonMask(0b101));
        assert!(mask.contains(ButtonMask::RIGHT));

        let mask = mask.with(ButtonMask::LEFT, false);
        assert_eq!(mask, ButtonMask::RIGHT);
        assert!(!mask.contains(ButtonMask::LEFT));
    }

    #[test]
    fn test_winit_buttons() {
        use winit::event::MouseButton;
        assert_eq!(
            ButtonMask::for_button(MouseButton::Middle),
            Some(ButtonMask::MIDDLE)
        );
        assert_eq!(ButtonMask::for_button(MouseButton::Back), None);
    }
}
