//! Clipboard Bridge: text sync between the local clipboard and a session.
//!
//! Inbound text arrives as a stream of base64 blobs and is committed to the
//! system clipboard only when the stream ends. Outbound text is read on
//! explicit request; when the system clipboard cannot be read the caller
//! gets a [`ManualClipboardEntry`] to collect the text from the user instead.

pub mod stream;
mod system;

pub use stream::{StreamError, TEXT_PLAIN, encode_text};
pub use system::{
    ArboardClipboard, ClipboardAccessError, MemoryClipboard, SharedClipboard, SystemClipboard,
};

use crate::session::LiveTransport;
use crate::transport::TransportError;
use par_remote_config::ClipboardConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use stream::StreamAssembler;

/// Result of an inbound stream reaching its end marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundClipboard {
    /// Written to the system clipboard
    Committed { bytes: usize },
    /// Kept as the session's last received text; system clipboard untouched
    Stored { bytes: usize },
    /// Received, but the system clipboard refused the write
    SystemUnavailable(ClipboardAccessError),
    Rejected(StreamError),
    /// End marker for a stream that was never opened or is not text
    Ignored,
}

/// Result of sending the local clipboard
#[derive(Debug)]
pub enum OutboundClipboard {
    Sent { bytes: usize },
    /// System clipboard is empty; nothing sent
    Empty,
    /// System clipboard unreadable: ask the user for the text
    ManualEntry(ManualClipboardEntry),
    NotConnected,
}

struct ClipboardState {
    assembler: StreamAssembler,
    last_received: Option<String>,
}

/// Per-session clipboard bridge. Clones share state.
#[derive(Clone)]
pub struct ClipboardBridge {
    state: Arc<Mutex<ClipboardState>>,
    system: SharedClipboard,
    transport: LiveTransport,
    config: ClipboardConfig,
}

impl ClipboardBridge {
    pub fn new(config: ClipboardConfig, system: SharedClipboard, transport: LiveTransport) -> Self {
        Self {
            state: Arc::new(Mutex::new(ClipboardState {
                assembler: StreamAssembler::new(config.max_inbound_bytes),
                last_received: None,
            })),
            system,
            transport,
            config,
        }
    }

    pub fn on_stream_start(&self, stream: u32, mime: &str) {
        self.state.lock().assembler.begin(stream, mime);
    }

    pub fn on_blob(&self, stream: u32, data: &str) {
        self.state.lock().assembler.append(stream, data);
    }

    pub fn on_stream_end(&self, stream: u32) -> InboundClipboard {
        let finished = self.state.lock().assembler.finish(stream);
        let text = match finished {
            None => return InboundClipboard::Ignored,
            Some(Err(e)) => {
                log::warn!("Dropped inbound clipboard stream {}: {}", stream, e);
                return InboundClipboard::Rejected(e);
            }
            Some(Ok(text)) => text,
        };

        let bytes = text.len();
        self.state.lock().last_received = Some(text.clone());

        if !self.config.sync_inbound {
            log::debug!("Inbound clipboard ({} bytes) kept local to session", bytes);
            return InboundClipboard::Stored { bytes };
        }
        match self.system.write_text(&text) {
            Ok(()) => {
                log::debug!("Remote clipboard ({} bytes) copied to system clipboard", bytes);
                InboundClipboard::Committed { bytes }
            }
            Err(e) => {
                log::warn!("Could not write system clipboard: {}", e);
                InboundClipboard::SystemUnavailable(e)
            }
        }
    }

    /// Last complete text received from the remote side
    pub fn last_received(&self) -> Option<String> {
        self.state.lock().last_received.clone()
    }

    /// Read the system clipboard and send it to the remote session
    pub fn send_local_clipboard(&self) -> OutboundClipboard {
        if !self.transport.is_live() {
            return OutboundClipboard::NotConnected;
        }
        match self.system.read_text() {
            Ok(text) => match self.send_text(&text) {
                Ok(bytes) => OutboundClipboard::Sent { bytes },
                Err(e) => {
                    log::warn!("Clipboard send failed: {}", e);
                    OutboundClipboard::NotConnected
                }
            },
            Err(ClipboardAccessError::Empty) => OutboundClipboard::Empty,
            Err(reason) => {
                log::info!("System clipboard unreadable ({}), falling back to manual entry", reason);
                OutboundClipboard::ManualEntry(ManualClipboardEntry {
                    bridge: self.clone(),
                    reason,
                })
            }
        }
    }

    /// Send `text` as one clipboard stream. Returns the byte count sent.
    pub fn send_text(&self, text: &str) -> Result<usize, TransportError> {
        let blobs = encode_text(text, self.config.chunk_size);
        self.transport
            .with(|t| {
                if !t.capabilities().clipboard {
                    return Err(TransportError::Unsupported("clipboard"));
                }
                t.send_clipboard(TEXT_PLAIN, &blobs)
            })
            .unwrap_or(Err(TransportError::Closed))?;
        log::debug!("Sent {} clipboard bytes in {} blobs", text.len(), blobs.len());
        Ok(text.len())
    }

    /// Drop partially received streams
    pub fn reset(&self) {
        self.state.lock().assembler.clear();
    }
}

impl std::fmt::Debug for ClipboardBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipboardBridge").finish_non_exhaustive()
    }
}

/// Pending manual clipboard entry, produced when the system clipboard is
/// unreadable. Confirming sends through the normal outbound path.
#[derive(Debug)]
pub struct ManualClipboardEntry {
    bridge: ClipboardBridge,
    reason: ClipboardAccessError,
}

impl ManualClipboardEntry {
    pub fn reason(&self) -> &ClipboardAccessError {
        &self.reason
    }

    pub fn confirm(self, text: &str) -> Result<usize, TransportError> {
        self.bridge.send_text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge(system: MemoryClipboard, sync_inbound: bool) -> ClipboardBridge {
        let config = ClipboardConfig {
            sync_inbound,
            ..Default::default()
        };
        ClipboardBridge::new(
            config,
            SharedClipboard::new(system),
            LiveTransport::detached(),
        )
    }

    fn deliver(bridge: &ClipboardBridge, stream: u32, text: &str) -> InboundClipboard {
        bridge.on_stream_start(stream, TEXT_PLAIN);
        for blob in encode_text(text, 8) {
            bridge.on_blob(stream, &blob);
        }
        bridge.on_stream_end(stream)
    }

    #[test]
    fn test_inbound_commits_on_end_only() {
        let system = MemoryClipboard::new();
        let clip = bridge(system.clone(), true);

        clip.on_stream_start(1, TEXT_PLAIN);
        for blob in encode_text("partial text", 8) {
            clip.on_blob(1, &blob);
        }
        assert_eq!(system.contents(), None);

        assert_eq!(clip.on_stream_end(1), InboundClipboard::Committed { bytes: 12 });
        assert_eq!(system.contents().as_deref(), Some("partial text"));
        assert_eq!(clip.last_received().as_deref(), Some("partial text"));
    }

    #[test]
    fn test_inbound_without_sync_stays_local() {
        let system = MemoryClipboard::new();
        let clip = bridge(system.clone(), false);
        assert_eq!(deliver(&clip, 4, "héllo"), InboundClipboard::Stored { bytes: 6 });
        assert_eq!(system.contents(), None);
        assert_eq!(clip.last_received().as_deref(), Some("héllo"));
    }

    #[test]
    fn test_denied_system_clipboard_on_inbound() {
        let clip = bridge(MemoryClipboard::denied(), true);
        assert_eq!(
            deliver(&clip, 2, "x"),
            InboundClipboard::SystemUnavailable(ClipboardAccessError::Denied)
        );
    }

    #[test]
    fn test_outbound_without_transport() {
        let system = MemoryClipboard::new();
        system.set_contents("hi");
        let clip = bridge(system, true);
        assert!(matches!(
            clip.send_local_clipboard(),
            OutboundClipboard::NotConnected
        ));
        assert_eq!(clip.send_text("hi"), Err(TransportError::Closed));
    }

    #[test]
    fn test_reset_drops_open_streams() {
        let clip = bridge(MemoryClipboard::new(), true);
        clip.on_stream_start(3, TEXT_PLAIN);
        clip.on_blob(3, "aGk=");
        clip.reset();
        assert_eq!(clip.on_stream_end(3), InboundClipboard::Ignored);
    }
}
