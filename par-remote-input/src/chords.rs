//! Synthetic shortcut definitions.
//!
//! These only describe *which* keys a shortcut presses; timing and delivery
//! live in the session's input bridge.

use crate::keysym::{
    XK_ALT_L, XK_CONTROL_L, XK_DELETE, XK_ESCAPE, XK_SHIFT_L, XK_SUPER_L, keysym_for_char,
};

/// Ctrl+Alt+Del, in press order
pub const SECURE_ATTENTION: [u32; 3] = [XK_CONTROL_L, XK_ALT_L, XK_DELETE];

/// Modifiers held while one key is tapped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    pub modifiers: Vec<u32>,
    pub key: u32,
}

impl KeyChord {
    pub fn new(modifiers: impl Into<Vec<u32>>, key: u32) -> Self {
        Self {
            modifiers: modifiers.into(),
            key,
        }
    }

    /// A single key with no modifiers
    pub fn single(key: u32) -> Self {
        Self::new(Vec::new(), key)
    }

    /// Super+L
    pub fn lock_screen() -> Self {
        Self::new([XK_SUPER_L], letter('l'))
    }

    /// Ctrl+Shift+Escape
    pub fn task_manager() -> Self {
        Self::new([XK_CONTROL_L, XK_SHIFT_L], XK_ESCAPE)
    }

    /// Ctrl+C, used to pull the remote selection into the remote clipboard
    pub fn copy() -> Self {
        Self::new([XK_CONTROL_L], letter('c'))
    }

    /// Keys in press order: modifiers first, then the key
    pub fn press_order(&self) -> Vec<u32> {
        let mut keys = self.modifiers.clone();
        keys.push(self.key);
        keys
    }

    /// Keys in release order: exact reverse of [`Self::press_order`]
    pub fn release_order(&self) -> Vec<u32> {
        let mut keys = self.press_order();
        keys.reverse();
        keys
    }

    /// Parse a chord string such as `"Ctrl+Shift+Escape"` or `"Super+L"`
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let (key_part, modifier_parts) = parts.split_last()?;

        let mut modifiers = Vec::with_capacity(modifier_parts.len());
        for part in modifier_parts {
            let keysym = match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => XK_CONTROL_L,
                "shift" => XK_SHIFT_L,
                "alt" | "option" => XK_ALT_L,
                "super" | "win" | "meta" | "cmd" => XK_SUPER_L,
                _ => return None,
            };
            modifiers.push(keysym);
        }

        let key = match key_part.to_ascii_lowercase().as_str() {
            "escape" | "esc" => XK_ESCAPE,
            "delete" | "del" => XK_DELETE,
            other => {
                let mut chars = other.chars();
                let c = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                keysym_for_char(c)?
            }
        };

        Some(Self { modifiers, key })
    }
}

/// Actions reachable from the Windows power-user menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Shutdown,
    Restart,
    SignOut,
    Sleep,
}

/// Three-stage "open menu, pick submenu, pick action" sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemCombo {
    /// Stage 1: chord that opens the menu
    pub opener: KeyChord,
    /// Stage 2: key that opens the submenu
    pub menu_key: u32,
    /// Stage 3: key that triggers the action
    pub action_key: u32,
}

impl SystemCombo {
    /// Super+X, then U (shut down or sign out submenu), then the action letter
    pub fn power_menu(action: PowerAction) -> Self {
        let action_letter = match action {
            PowerAction::Shutdown => 'u',
            PowerAction::Restart => 'r',
            PowerAction::SignOut => 'i',
            PowerAction::Sleep => 's',
        };
        Self {
            opener: KeyChord::new([XK_SUPER_L], letter('x')),
            menu_key: letter('u'),
            action_key: letter(action_letter),
        }
    }
}

fn letter(c: char) -> u32 {
    c as u32
}
