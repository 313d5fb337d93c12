//! Input Event Bridge: local pointer and keyboard events to protocol messages.
//!
//! Pointer coordinates are remapped through the session's viewport scale and
//! forwarded synchronously. Keys are translated by `par-remote-input` into
//! the code space of the live transport. Multi-key synthetic sequences live
//! in [`sequences`].

mod capture;
mod sequences;

pub use capture::KeyboardCapture;
pub use sequences::SequenceOutcome;

use crate::session::LiveTransport;
use crate::transport::{ButtonMask, PointerState, TransportError};
use crate::viewport::ViewportNegotiator;
use par_remote_config::InputConfig;
use par_remote_input::{KeyInput, ModifierState, translate};
use parking_lot::Mutex;
use std::sync::Arc;

/// Whether local input reaches the remote side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Display only; pointer and keys are swallowed locally
    ViewOnly,
    #[default]
    Interactive,
}

/// What happened to one input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    Forwarded,
    /// Dropped by the view-only overlay
    Swallowed,
    /// No live transport
    NotConnected,
    /// Key has no remote equivalent
    Untranslatable,
    /// No session owns the keyboard
    NoOwner,
}

struct InputState {
    mode: InputMode,
    buttons: ButtonMask,
    position: (u32, u32),
    modifiers: ModifierState,
}

/// Per-session input bridge. Clones share state.
#[derive(Clone)]
pub struct InputBridge {
    state: Arc<Mutex<InputState>>,
    viewport: ViewportNegotiator,
    transport: LiveTransport,
    config: InputConfig,
}

impl InputBridge {
    pub fn new(
        config: InputConfig,
        viewport: ViewportNegotiator,
        transport: LiveTransport,
        mode: InputMode,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(InputState {
                mode,
                buttons: ButtonMask::NONE,
                position: (0, 0),
                modifiers: ModifierState::default(),
            })),
            viewport,
            transport,
            config,
        }
    }

    pub fn mode(&self) -> InputMode {
        self.state.lock().mode
    }

    pub fn set_mode(&self, mode: InputMode) {
        let mut state = self.state.lock();
        if state.mode != mode {
            log::info!("Input mode changed to {:?}", mode);
        }
        state.mode = mode;
        if mode == InputMode::ViewOnly {
            // Held buttons and modifiers would otherwise stick on the remote side
            state.buttons = ButtonMask::NONE;
            state.modifiers = ModifierState::default();
        }
    }

    /// Local cursor is only drawn over the remote display when interactive
    pub fn cursor_visible(&self) -> bool {
        self.mode() == InputMode::Interactive
    }

    /// Current button mask, as last sent
    pub fn buttons(&self) -> ButtonMask {
        self.state.lock().buttons
    }

    /// Pointer moved to a local container coordinate
    pub fn pointer_moved(&self, x: f64, y: f64) -> InputOutcome {
        let position = self.viewport.to_remote(x, y);
        self.send_pointer(|state| state.position = position)
    }

    /// A button went down or up at the last known position
    pub fn pointer_button(&self, button: ButtonMask, pressed: bool) -> InputOutcome {
        self.send_pointer(|state| state.buttons = state.buttons.with(button, pressed))
    }

    /// Wheel scroll, sent as press+release of the wheel buttons; positive is up
    pub fn pointer_scrolled(&self, lines: i32) -> InputOutcome {
        let button = if lines >= 0 {
            ButtonMask::SCROLL_UP
        } else {
            ButtonMask::SCROLL_DOWN
        };
        let mut outcome = InputOutcome::Forwarded;
        for _ in 0..lines.unsigned_abs() {
            outcome = self.pointer_button(button, true);
            if outcome != InputOutcome::Forwarded {
                break;
            }
            outcome = self.pointer_button(button, false);
        }
        outcome
    }

    /// The lock stays held across the send so concurrent callers cannot
    /// reorder pointer messages.
    fn send_pointer(&self, update: impl FnOnce(&mut InputState)) -> InputOutcome {
        let mut state = self.state.lock();
        if state.mode == InputMode::ViewOnly {
            return InputOutcome::Swallowed;
        }
        update(&mut state);
        let pointer = PointerState {
            x: state.position.0,
            y: state.position.1,
            buttons: state.buttons,
        };
        match self.transport.with(|t| t.send_pointer(pointer)) {
            Some(Ok(())) => {
                crate::debug_trace!("INPUT", "Pointer {:?}", pointer);
                InputOutcome::Forwarded
            }
            Some(Err(e)) => {
                log::debug!("Pointer send failed: {}", e);
                InputOutcome::NotConnected
            }
            None => InputOutcome::NotConnected,
        }
    }

    /// Forward one raw key event
    pub fn handle_key(&self, input: &KeyInput) -> InputOutcome {
        let mut state = self.state.lock();
        if state.mode == InputMode::ViewOnly {
            return InputOutcome::Swallowed;
        }
        let result = self.transport.with(|t| {
            let Some(key) = translate(input, t.code_space()) else {
                return Ok(None);
            };
            t.send_key(&key, input.pressed).map(|()| Some(key))
        });
        match result {
            None => InputOutcome::NotConnected,
            Some(Ok(None)) => InputOutcome::Untranslatable,
            Some(Ok(Some(key))) => {
                state.modifiers.update(key.keysym, input.pressed);
                crate::debug_trace!(
                    "INPUT",
                    "Key 0x{:X} {}",
                    key.keysym,
                    if input.pressed { "down" } else { "up" }
                );
                InputOutcome::Forwarded
            }
            Some(Err(e)) => {
                log::debug!("Key send failed: {}", e);
                InputOutcome::NotConnected
            }
        }
    }

    /// Modifiers currently held on the remote side
    pub fn modifiers(&self) -> ModifierState {
        self.state.lock().modifiers
    }

    pub(crate) fn transport(&self) -> &LiveTransport {
        &self.transport
    }

    pub(crate) fn config(&self) -> &InputConfig {
        &self.config
    }
}

impl std::fmt::Debug for InputBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputBridge")
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

pub(crate) fn is_disconnect(err: &TransportError) -> bool {
    matches!(err, TransportError::Closed)
}
