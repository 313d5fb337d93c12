// X11 keysym to terminal input byte conversion

use crate::keysym::{
    ModifierState, XK_BACKSPACE, XK_DELETE, XK_DOWN, XK_END, XK_ESCAPE, XK_F1, XK_HOME,
    XK_INSERT, XK_LEFT, XK_PAGE_DOWN, XK_PAGE_UP, XK_RETURN, XK_RIGHT, XK_TAB, XK_UP,
    char_for_keysym, is_modifier,
};

/// Convert a key press into the bytes a terminal expects.
///
/// Releases and bare modifier presses produce nothing. Alt prefixes the
/// result with ESC, Control folds letters and `@[\]^_` into C0 codes.
pub fn keysym_to_terminal_bytes(keysym: u32, pressed: bool, mods: &ModifierState) -> Vec<u8> {
    if !pressed || is_modifier(keysym) {
        return Vec::new();
    }

    let mut bytes = if mods.control {
        control_bytes(keysym).unwrap_or_else(|| plain_bytes(keysym))
    } else {
        plain_bytes(keysym)
    };

    if mods.alt && !bytes.is_empty() {
        bytes.insert(0, 0x1B);
    }
    bytes
}

fn control_bytes(keysym: u32) -> Option<Vec<u8>> {
    let byte = match keysym {
        // Ctrl+A (0x41) -> 0x01 ... Ctrl+Z -> 0x1A
        0x0041..=0x005A => (keysym - 0x40) as u8,
        0x0061..=0x007A => (keysym - 0x60) as u8,
        // @ [ \ ] ^ _ -> NUL ESC FS GS RS US
        0x0040 | 0x005B..=0x005F => (keysym - 0x40) as u8,
        0x0020 => 0x00,
        _ => return None,
    };
    Some(vec![byte])
}

fn plain_bytes(keysym: u32) -> Vec<u8> {
    match keysym {
        XK_RETURN => vec![b'\r'],
        XK_BACKSPACE => vec![0x7F],
        XK_TAB => vec![b'\t'],
        XK_ESCAPE => vec![0x1B],

        XK_LEFT => b"\x1b[D".to_vec(),
        XK_UP => b"\x1b[A".to_vec(),
        XK_RIGHT => b"\x1b[C".to_vec(),
        XK_DOWN => b"\x1b[B".to_vec(),
        XK_HOME => b"\x1b[H".to_vec(),
        XK_END => b"\x1b[F".to_vec(),
        XK_INSERT => b"\x1b[2~".to_vec(),
        XK_DELETE => b"\x1b[3~".to_vec(),
        XK_PAGE_UP => b"\x1b[5~".to_vec(),
        XK_PAGE_DOWN => b"\x1b[6~".to_vec(),

        // F1-F4 use SS3, F5-F12 use CSI n ~ (note the gaps at 16 and 22)
        k if (XK_F1..XK_F1 + 4).contains(&k) => {
            vec![0x1B, b'O', b'P' + (k - XK_F1) as u8]
        }
        k if (XK_F1 + 4..XK_F1 + 12).contains(&k) => {
            const CODES: [u8; 8] = [15, 17, 18, 19, 20, 21, 23, 24];
            format!("\x1b[{}~", CODES[(k - XK_F1 - 4) as usize]).into_bytes()
        }

        other => match char_for_keysym(other) {
            Some(c) => {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf).as_bytes().to_vec()
            }
            None => {
                log::debug!("Unmapped keysym for terminal session: 0x{:X}", other);
                Vec::new()
            }
        },
    }
}
