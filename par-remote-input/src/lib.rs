//! Keyboard translation for par-remote.
//!
//! Converts winit key events into the key codes remote protocols expect:
//!
//! - [`keysym`] — X11 keysym constants, character/named-key lookup, modifier tracking
//! - [`translate`] — [`KeyInput`] → [`RemoteKey`] in either code space
//! - [`chords`] — synthetic shortcut definitions (chords, system combos, secure attention)
//! - [`terminal`] — keysym → VT byte sequences for terminal-mode sessions

pub mod chords;
pub mod keysym;
pub mod terminal;
pub mod translate;

pub use chords::{KeyChord, PowerAction, SECURE_ATTENTION, SystemCombo};
pub use keysym::ModifierState;
pub use terminal::keysym_to_terminal_bytes;
pub use translate::{KeyCodeSpace, KeyInput, RemoteKey, translate};
