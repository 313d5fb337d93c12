//! Access to the local system clipboard.

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

/// Why the system clipboard could not be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipboardAccessError {
    #[error("clipboard access denied")]
    Denied,

    #[error("clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("clipboard holds no text")]
    Empty,
}

/// The local clipboard, as seen by the bridge
pub trait SystemClipboard: Send {
    fn read_text(&mut self) -> Result<String, ClipboardAccessError>;

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardAccessError>;
}

/// `arboard`-backed clipboard.
///
/// A fresh `arboard::Clipboard` is opened per operation; the handle is not
/// `Send` on every platform.
#[derive(Debug, Default)]
pub struct ArboardClipboard;

impl SystemClipboard for ArboardClipboard {
    fn read_text(&mut self) -> Result<String, ClipboardAccessError> {
        let mut clipboard = arboard::Clipboard::new().map_err(map_arboard_error)?;
        let text = clipboard.get_text().map_err(map_arboard_error)?;
        log::debug!("Read {} bytes from system clipboard", text.len());
        Ok(text)
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardAccessError> {
        let mut clipboard = arboard::Clipboard::new().map_err(map_arboard_error)?;
        clipboard
            .set_text(text.to_string())
            .map_err(map_arboard_error)
    }
}

fn map_arboard_error(err: arboard::Error) -> ClipboardAccessError {
    match err {
        arboard::Error::ContentNotAvailable => ClipboardAccessError::Empty,
        arboard::Error::ClipboardNotSupported => {
            ClipboardAccessError::Unavailable("not supported on this platform".to_string())
        }
        arboard::Error::ClipboardOccupied => ClipboardAccessError::Denied,
        other => ClipboardAccessError::Unavailable(other.to_string()),
    }
}

/// Process-wide clipboard handle. Each read or write holds the lock for the
/// whole operation.
#[derive(Clone)]
pub struct SharedClipboard(Arc<Mutex<Box<dyn SystemClipboard>>>);

impl SharedClipboard {
    pub fn new(clipboard: impl SystemClipboard + 'static) -> Self {
        Self(Arc::new(Mutex::new(Box::new(clipboard))))
    }

    /// Shared handle over the real system clipboard
    pub fn system() -> Self {
        Self::new(ArboardClipboard)
    }

    pub fn read_text(&self) -> Result<String, ClipboardAccessError> {
        self.0.lock().read_text()
    }

    pub fn write_text(&self, text: &str) -> Result<(), ClipboardAccessError> {
        self.0.lock().write_text(text)
    }
}

impl std::fmt::Debug for SharedClipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedClipboard")
    }
}

/// In-memory clipboard, for tests and headless use
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    text: Arc<Mutex<Option<String>>>,
    denied: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard that refuses every access
    pub fn denied() -> Self {
        Self {
            denied: true,
            ..Self::default()
        }
    }

    /// Current contents, visible through every clone
    pub fn contents(&self) -> Option<String> {
        self.text.lock().clone()
    }

    pub fn set_contents(&self, text: &str) {
        *self.text.lock() = Some(text.to_string());
    }
}

impl SystemClipboard for MemoryClipboard {
    fn read_text(&mut self) -> Result<String, ClipboardAccessError> {
        if self.denied {
            return Err(ClipboardAccessError::Denied);
        }
        self.text.lock().clone().ok_or(ClipboardAccessError::Empty)
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardAccessError> {
        if self.denied {
            return Err(ClipboardAccessError::Denied);
        }
        *self.text.lock() = Some(text.to_string());
        Ok(())
    }
}
