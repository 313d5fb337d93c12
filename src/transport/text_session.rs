//! Terminal-mode SSH sessions as a [`RemoteTransport`].
//!
//! Wraps the host [`TextSessionService`]: keys become VT byte sequences,
//! container pixels become a cols/rows grid, pasted clipboard text becomes
//! input bytes. A writer task serialises all outbound calls to the service.

use super::{
    PointerState, RemoteState, RemoteTransport, TransportCapabilities, TransportConnection,
    TransportError, TransportEvent,
};
use crate::host::{HostError, TextSessionEvent, TextSessionService};
use crate::session::ConnectionParams;
use crate::viewport::Size;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use par_remote_config::TextSessionConfig;
use par_remote_input::{KeyCodeSpace, ModifierState, RemoteKey, keysym_to_terminal_bytes};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

enum Outbound {
    Write(Vec<u8>),
    Resize { cols: u16, rows: u16 },
    Disconnect,
}

/// Outbound half of a text session
pub struct TextSessionTransport {
    outbound: mpsc::UnboundedSender<Outbound>,
    modifiers: Mutex<ModifierState>,
    cells: TextSessionConfig,
}

/// Open a text session and wrap it as a transport connection
pub async fn connect(
    service: Arc<dyn TextSessionService>,
    params: &ConnectionParams,
    cells: TextSessionConfig,
) -> Result<TransportConnection, HostError> {
    let handle = service.connect(params).await?;
    let id = handle.id;
    log::info!("Text session {} opened to {}", id, params.host);

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();

    // A shell is usable as soon as the service hands it over
    let _ = event_tx.send(TransportEvent::State(RemoteState::Connected));
    tokio::spawn(pump_events(handle.events, event_tx));
    tokio::spawn(write_loop(service, id, out_rx));

    Ok(TransportConnection {
        transport: Box::new(TextSessionTransport {
            outbound: out_tx,
            modifiers: Mutex::new(ModifierState::default()),
            cells,
        }),
        events: event_rx,
    })
}

async fn pump_events(
    mut events: mpsc::UnboundedReceiver<TextSessionEvent>,
    tx: mpsc::UnboundedSender<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            TextSessionEvent::Data(bytes) => {
                if tx.send(TransportEvent::Output(bytes)).is_err() {
                    return;
                }
            }
            TextSessionEvent::Closed => break,
        }
    }
    let _ = tx.send(TransportEvent::Closed);
}

async fn write_loop(
    service: Arc<dyn TextSessionService>,
    id: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(message) = outbound.recv().await {
        let result = match message {
            Outbound::Write(bytes) => service.write(&id, bytes).await,
            Outbound::Resize { cols, rows } => service.resize(&id, cols, rows).await,
            Outbound::Disconnect => break,
        };
        if let Err(e) = result {
            log::warn!("Text session {} write failed: {}", id, e);
        }
    }
    // Reached on explicit disconnect or when the transport is dropped
    if let Err(e) = service.disconnect(&id).await {
        log::debug!("Text session {} disconnect: {}", id, e);
    }
    log::info!("Text session {} closed", id);
}

/// Grid for a container size; never smaller than 1x1
pub fn grid_for(size: Size, cells: &TextSessionConfig) -> (u16, u16) {
    let cols = (size.width / cells.cell_width.max(1)).clamp(1, u16::MAX as u32);
    let rows = (size.height / cells.cell_height.max(1)).clamp(1, u16::MAX as u32);
    (cols as u16, rows as u16)
}

impl TextSessionTransport {
    fn enqueue(&self, message: Outbound) -> Result<(), TransportError> {
        self.outbound
            .send(message)
            .map_err(|_| TransportError::Closed)
    }
}

impl RemoteTransport for TextSessionTransport {
    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            dynamic_resize: true,
            native_secure_attention: false,
            clipboard: true,
        }
    }

    fn code_space(&self) -> KeyCodeSpace {
        KeyCodeSpace::Keysym
    }

    fn send_pointer(&self, _state: PointerState) -> Result<(), TransportError> {
        // No pointer in a text session
        Ok(())
    }

    fn send_key(&self, key: &RemoteKey, pressed: bool) -> Result<(), TransportError> {
        let bytes = {
            let mut modifiers = self.modifiers.lock();
            if modifiers.update(key.keysym, pressed) {
                return Ok(());
            }
            keysym_to_terminal_bytes(key.keysym, pressed, &modifiers)
        };
        if bytes.is_empty() {
            return Ok(());
        }
        self.enqueue(Outbound::Write(bytes))
    }

    fn send_clipboard(&self, _mime: &str, blobs: &[String]) -> Result<(), TransportError> {
        let mut bytes = Vec::new();
        for blob in blobs {
            let chunk = STANDARD
                .decode(blob)
                .map_err(|e| TransportError::Send(format!("bad clipboard blob: {e}")))?;
            bytes.extend_from_slice(&chunk);
        }
        if bytes.is_empty() {
            return Ok(());
        }
        self.enqueue(Outbound::Write(bytes))
    }

    fn send_size(&self, size: Size) -> Result<(), TransportError> {
        let (cols, rows) = grid_for(size, &self.cells);
        self.enqueue(Outbound::Resize { cols, rows })
    }

    fn disconnect(&self) {
        let _ = self.enqueue(Outbound::Disconnect);
    }
}
