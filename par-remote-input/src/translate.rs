//! Key event translation into protocol-native key codes.

use crate::keysym::{keysym_for_char, keysym_for_named, keysym_for_physical};
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{Key, PhysicalKey};

/// Which key code space a transport speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCodeSpace {
    /// Numeric keysym only (gateway protocol)
    Keysym,
    /// Keysym plus optional platform code string (relay-based RFB)
    KeysymWithCode,
}

/// A key as sent to the remote side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteKey {
    pub keysym: u32,
    /// W3C `KeyboardEvent.code` style name, e.g. `"KeyA"` or `"ControlLeft"`
    pub code: Option<String>,
}

impl RemoteKey {
    /// A key with no platform code
    pub fn keysym(keysym: u32) -> Self {
        Self { keysym, code: None }
    }

    /// Build the key for a synthetic sequence in the given code space
    pub fn synthetic(keysym: u32, space: KeyCodeSpace) -> Self {
        let code = match space {
            KeyCodeSpace::Keysym => None,
            KeyCodeSpace::KeysymWithCode => crate::keysym::code_for_keysym(keysym),
        };
        Self { keysym, code }
    }
}

/// Raw key input captured from the local window.
///
/// Mirrors the fields of `winit::event::KeyEvent` this crate needs; winit's
/// own type cannot be constructed outside winit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub logical: Key,
    pub physical: PhysicalKey,
    pub pressed: bool,
}

impl KeyInput {
    pub fn new(logical: Key, physical: PhysicalKey, pressed: bool) -> Self {
        Self {
            logical,
            physical,
            pressed,
        }
    }
}

impl From<&KeyEvent> for KeyInput {
    fn from(event: &KeyEvent) -> Self {
        Self {
            logical: event.logical_key.clone(),
            physical: event.physical_key,
            pressed: event.state == ElementState::Pressed,
        }
    }
}

/// Translate a local key event into a remote key.
///
/// Returns `None` for keys with no keysym (dead keys, unidentified keys,
/// multi-character compositions).
pub fn translate(input: &KeyInput, space: KeyCodeSpace) -> Option<RemoteKey> {
    let keysym = keysym_for_physical(input.physical).or_else(|| match &input.logical {
        Key::Named(named) => keysym_for_named(*named),
        Key::Character(s) => {
            let mut chars = s.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            keysym_for_char(c)
        }
        _ => None,
    });

    let Some(keysym) = keysym else {
        log::trace!("No keysym for {:?} / {:?}", input.logical, input.physical);
        return None;
    };

    let code = match space {
        KeyCodeSpace::Keysym => None,
        KeyCodeSpace::KeysymWithCode => match input.physical {
            // winit's KeyCode variant names follow the W3C code naming
            PhysicalKey::Code(code) => Some(format!("{code:?}")),
            PhysicalKey::Unidentified(_) => None,
        },
    };

    Some(RemoteKey { keysym, code })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keysym::{XK_CONTROL_R, XK_RETURN};
    use winit::keyboard::{KeyCode, NamedKey, NativeKeyCode};

    fn key(logical: Key, code: KeyCode) -> KeyInput {
        KeyInput::new(logical, PhysicalKey::Code(code), true)
    }

    #[test]
    fn test_character_in_gateway_space() {
        let input = key(Key::Character("a".into()), KeyCode::KeyA);
        let remote = translate(&input, KeyCodeSpace::Keysym).expect("keysym");
        assert_eq!(remote, RemoteKey::keysym(0x61));
    }

    #[test]
    fn test_character_in_relay_space_carries_code() {
        let input = key(Key::Character("A".into()), KeyCode::KeyA);
        let remote = translate(&input, KeyCodeSpace::KeysymWithCode).expect("keysym");
        assert_eq!(remote.keysym, 0x41);
        assert_eq!(remote.code.as_deref(), Some("KeyA"));
    }

    #[test]
    fn test_right_control_uses_physical_side() {
        let input = key(Key::Named(NamedKey::Control), KeyCode::ControlRight);
        let remote = translate(&input, KeyCodeSpace::KeysymWithCode).expect("keysym");
        assert_eq!(remote.keysym, XK_CONTROL_R);
        assert_eq!(remote.code.as_deref(), Some("ControlRight"));
    }

    #[test]
    fn test_named_key_with_unidentified_physical() {
        let input = KeyInput::new(
            Key::Named(NamedKey::Enter),
            PhysicalKey::Unidentified(NativeKeyCode::Unidentified),
            false,
        );
        let remote = translate(&input, KeyCodeSpace::KeysymWithCode).expect("keysym");
        assert_eq!(remote.keysym, XK_RETURN);
        assert_eq!(remote.code, None);
    }

    #[test]
    fn test_compositions_are_dropped() {
        let input = key(Key::Character("ab".into()), KeyCode::KeyA);
        assert!(translate(&input, KeyCodeSpace::Keysym).is_none());
    }

    #[test]
    fn test_synthetic_key_codes() {
        assert_eq!(RemoteKey::synthetic(0x6C, KeyCodeSpace::Keysym).code, None);
        assert_eq!(
            RemoteKey::synthetic(0x6C, KeyCodeSpace::KeysymWithCode)
                .code
                .as_deref(),
            Some("KeyL")
        );
    }
}
