//! X11 keysym constants and lookups.
//!
//! Both the gateway protocol and RFB identify keys by X11 keysym. Latin-1
//! characters map to their code point; every other Unicode character maps to
//! `0x0100_0000 | codepoint`.

use winit::keyboard::{KeyCode, NamedKey, PhysicalKey};

pub const XK_BACKSPACE: u32 = 0xFF08;
pub const XK_TAB: u32 = 0xFF09;
pub const XK_RETURN: u32 = 0xFF0D;
pub const XK_PAUSE: u32 = 0xFF13;
pub const XK_SCROLL_LOCK: u32 = 0xFF14;
pub const XK_ESCAPE: u32 = 0xFF1B;
pub const XK_HOME: u32 = 0xFF50;
pub const XK_LEFT: u32 = 0xFF51;
pub const XK_UP: u32 = 0xFF52;
pub const XK_RIGHT: u32 = 0xFF53;
pub const XK_DOWN: u32 = 0xFF54;
pub const XK_PAGE_UP: u32 = 0xFF55;
pub const XK_PAGE_DOWN: u32 = 0xFF56;
pub const XK_END: u32 = 0xFF57;
pub const XK_PRINT: u32 = 0xFF61;
pub const XK_INSERT: u32 = 0xFF63;
pub const XK_MENU: u32 = 0xFF67;
pub const XK_NUM_LOCK: u32 = 0xFF7F;
pub const XK_F1: u32 = 0xFFBE;
pub const XK_F12: u32 = 0xFFC9;
pub const XK_SHIFT_L: u32 = 0xFFE1;
pub const XK_SHIFT_R: u32 = 0xFFE2;
pub const XK_CONTROL_L: u32 = 0xFFE3;
pub const XK_CONTROL_R: u32 = 0xFFE4;
pub const XK_CAPS_LOCK: u32 = 0xFFE5;
pub const XK_META_L: u32 = 0xFFE7;
pub const XK_META_R: u32 = 0xFFE8;
pub const XK_ALT_L: u32 = 0xFFE9;
pub const XK_ALT_R: u32 = 0xFFEA;
pub const XK_SUPER_L: u32 = 0xFFEB;
pub const XK_SUPER_R: u32 = 0xFFEC;
pub const XK_ALT_GR: u32 = 0xFE03;
pub const XK_DELETE: u32 = 0xFFFF;

/// Keysym for a single character, or `None` for control characters.
pub fn keysym_for_char(c: char) -> Option<u32> {
    let cp = c as u32;
    match cp {
        0x00..=0x1F | 0x7F..=0x9F => None,
        0x20..=0x7E | 0xA0..=0xFF => Some(cp),
        _ => Some(0x0100_0000 | cp),
    }
}

/// Inverse of [`keysym_for_char`] for printable keysyms.
pub fn char_for_keysym(keysym: u32) -> Option<char> {
    match keysym {
        0x20..=0x7E | 0xA0..=0xFF => char::from_u32(keysym),
        0x0100_0000..=0x0110_FFFF => char::from_u32(keysym & 0x00FF_FFFF),
        _ => None,
    }
}

/// Keysym for a named (non-character) key.
///
/// Modifiers resolve to their left-hand variant; use [`keysym_for_physical`]
/// to tell left from right.
pub fn keysym_for_named(key: NamedKey) -> Option<u32> {
    let keysym = match key {
        NamedKey::Enter => XK_RETURN,
        NamedKey::Tab => XK_TAB,
        NamedKey::Space => 0x0020,
        NamedKey::Backspace => XK_BACKSPACE,
        NamedKey::Escape => XK_ESCAPE,
        NamedKey::Delete => XK_DELETE,
        NamedKey::Insert => XK_INSERT,
        NamedKey::Home => XK_HOME,
        NamedKey::End => XK_END,
        NamedKey::PageUp => XK_PAGE_UP,
        NamedKey::PageDown => XK_PAGE_DOWN,
        NamedKey::ArrowLeft => XK_LEFT,
        NamedKey::ArrowUp => XK_UP,
        NamedKey::ArrowRight => XK_RIGHT,
        NamedKey::ArrowDown => XK_DOWN,
        NamedKey::Shift => XK_SHIFT_L,
        NamedKey::Control => XK_CONTROL_L,
        NamedKey::Alt => XK_ALT_L,
        NamedKey::AltGraph => XK_ALT_GR,
        NamedKey::Super => XK_SUPER_L,
        NamedKey::Meta => XK_META_L,
        NamedKey::CapsLock => XK_CAPS_LOCK,
        NamedKey::NumLock => XK_NUM_LOCK,
        NamedKey::ScrollLock => XK_SCROLL_LOCK,
        NamedKey::PrintScreen => XK_PRINT,
        NamedKey::Pause => XK_PAUSE,
        NamedKey::ContextMenu => XK_MENU,
        NamedKey::F1 => XK_F1,
        NamedKey::F2 => XK_F1 + 1,
        NamedKey::F3 => XK_F1 + 2,
        NamedKey::F4 => XK_F1 + 3,
        NamedKey::F5 => XK_F1 + 4,
        NamedKey::F6 => XK_F1 + 5,
        NamedKey::F7 => XK_F1 + 6,
        NamedKey::F8 => XK_F1 + 7,
        NamedKey::F9 => XK_F1 + 8,
        NamedKey::F10 => XK_F1 + 9,
        NamedKey::F11 => XK_F1 + 10,
        NamedKey::F12 => XK_F12,
        _ => return None,
    };
    Some(keysym)
}

/// Side-specific keysym for modifier keys, based on the physical key.
pub fn keysym_for_physical(physical: PhysicalKey) -> Option<u32> {
    let PhysicalKey::Code(code) = physical else {
        return None;
    };
    let keysym = match code {
        KeyCode::ShiftLeft => XK_SHIFT_L,
        KeyCode::ShiftRight => XK_SHIFT_R,
        KeyCode::ControlLeft => XK_CONTROL_L,
        KeyCode::ControlRight => XK_CONTROL_R,
        KeyCode::AltLeft => XK_ALT_L,
        KeyCode::AltRight => XK_ALT_R,
        KeyCode::SuperLeft => XK_SUPER_L,
        KeyCode::SuperRight => XK_SUPER_R,
        _ => return None,
    };
    Some(keysym)
}

/// Returns true for keysyms that only modify other keys.
pub fn is_modifier(keysym: u32) -> bool {
    matches!(
        keysym,
        XK_SHIFT_L
            | XK_SHIFT_R
            | XK_CONTROL_L
            | XK_CONTROL_R
            | XK_META_L
            | XK_META_R
            | XK_ALT_L
            | XK_ALT_R
            | XK_SUPER_L
            | XK_SUPER_R
            | XK_ALT_GR
    )
}

/// Platform key code string (W3C `KeyboardEvent.code` naming) for the keysyms
/// used in synthetic sequences. Relay-based sessions send it alongside the
/// keysym so layout-independent shortcuts land on the right physical key.
pub fn code_for_keysym(keysym: u32) -> Option<String> {
    let code = match keysym {
        XK_SHIFT_L => "ShiftLeft",
        XK_SHIFT_R => "ShiftRight",
        XK_CONTROL_L => "ControlLeft",
        XK_CONTROL_R => "ControlRight",
        XK_ALT_L => "AltLeft",
        XK_ALT_R => "AltRight",
        XK_SUPER_L | XK_META_L => "MetaLeft",
        XK_SUPER_R | XK_META_R => "MetaRight",
        XK_DELETE => "Delete",
        XK_ESCAPE => "Escape",
        XK_RETURN => "Enter",
        XK_TAB => "Tab",
        XK_BACKSPACE => "Backspace",
        0x0020 => "Space",
        0x0061..=0x007A | 0x0041..=0x005A => {
            let letter = char::from_u32(keysym)?.to_ascii_uppercase();
            return Some(format!("Key{letter}"));
        }
        0x0030..=0x0039 => {
            let digit = char::from_u32(keysym)?;
            return Some(format!("Digit{digit}"));
        }
        _ => return None,
    };
    Some(code.to_string())
}

/// Modifier key state tracker
///
/// Tracks which modifier keys are currently pressed (Control, Shift, Alt, Meta/Super).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModifierState {
    pub control: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl ModifierState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update modifier state based on keysym
    ///
    /// Returns true if this was a modifier key that was handled
    pub fn update(&mut self, keysym: u32, pressed: bool) -> bool {
        match keysym {
            XK_CONTROL_L | XK_CONTROL_R => self.control = pressed,
            XK_SHIFT_L | XK_SHIFT_R => self.shift = pressed,
            XK_ALT_L | XK_ALT_R => self.alt = pressed,
            XK_META_L | XK_META_R | XK_SUPER_L | XK_SUPER_R => self.meta = pressed,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_and_unicode_keysyms() {
        assert_eq!(keysym_for_char('a'), Some(0x61));
        assert_eq!(keysym_for_char('é'), Some(0xE9));
        assert_eq!(keysym_for_char('€'), Some(0x0100_20AC));
        assert_eq!(keysym_for_char('\u{7}'), None);
        assert_eq!(char_for_keysym(0x0100_20AC), Some('€'));
        assert_eq!(char_for_keysym(XK_RETURN), None);
    }

    #[test]
    fn test_named_keys() {
        assert_eq!(keysym_for_named(NamedKey::Enter), Some(XK_RETURN));
        assert_eq!(keysym_for_named(NamedKey::F5), Some(0xFFC2));
        assert_eq!(keysym_for_named(NamedKey::F12), Some(0xFFC9));
        assert_eq!(keysym_for_named(NamedKey::Super), Some(XK_SUPER_L));
    }

    #[test]
    fn test_physical_right_modifiers() {
        assert_eq!(
            keysym_for_physical(PhysicalKey::Code(KeyCode::ControlRight)),
            Some(XK_CONTROL_R)
        );
        assert_eq!(keysym_for_physical(PhysicalKey::Code(KeyCode::KeyA)), None);
    }

    #[test]
    fn test_code_for_keysym() {
        assert_eq!(code_for_keysym(0x78).as_deref(), Some("KeyX"));
        assert_eq!(code_for_keysym(0x37).as_deref(), Some("Digit7"));
        assert_eq!(code_for_keysym(XK_SUPER_L).as_deref(), Some("MetaLeft"));
        assert_eq!(code_for_keysym(0x0100_20AC), None);
    }

    #[test]
    fn test_modifier_state_tracking() {
        let mut state = ModifierState::new();
        assert!(state.update(XK_CONTROL_R, true));
        assert!(state.control);
        assert!(!state.update(0x61, true));
        assert!(state.update(XK_CONTROL_L, false));
        assert!(!state.control);
    }
}
