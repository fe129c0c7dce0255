//! PTY input encoding
//!
//! Converts keys, mouse input and pastes into the bytes a program running on
//! the PTY expects to read.

use crossterm::event::{KeyCode, KeyModifiers, MouseButton};

use super::{MouseAction, MouseInput, WheelDirection};

/// Largest 1-based coordinate an X10 report can carry (223 + 32 = 255)
const X10_MAX_COORD: u32 = 223;

/// Mouse reporting encodings a child can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEncoding {
    /// Legacy `ESC [ M cb cx cy` with coordinates offset by 32
    X10,
    /// `ESC [ < cb ; x ; y M|m`
    Sgr,
}

/// Convert a crossterm key event to bytes to send to the PTY
///
/// This handles special keys and modifier combinations that need
/// to be sent as escape sequences or control characters. With
/// `app_cursor` set (DECCKM), unmodified cursor keys use SS3 sequences.
pub fn key_to_pty_bytes(code: KeyCode, modifiers: KeyModifiers, app_cursor: bool) -> Option<Vec<u8>> {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    let alt = modifiers.contains(KeyModifiers::ALT);
    let shift = modifiers.contains(KeyModifiers::SHIFT);

    // Handle Ctrl+key combinations (send as control characters)
    if ctrl && !alt {
        if let KeyCode::Char(c) = code {
            if let Some(byte) = ctrl_char(c) {
                return Some(vec![byte]);
            }
        }
    }

    // Ctrl+Alt+letter is ESC followed by the control character
    if ctrl && alt {
        if let KeyCode::Char(c) = code {
            if let Some(byte) = ctrl_char(c) {
                return Some(vec![0x1b, byte]);
            }
        }
    }

    // Handle Alt+key (send as ESC + key)
    if alt && !ctrl {
        if let KeyCode::Char(c) = code {
            let c = if shift { c.to_ascii_uppercase() } else { c };
            let mut bytes = vec![0x1b];
            bytes.extend_from_slice(c.encode_utf8(&mut [0u8; 4]).as_bytes());
            return Some(bytes);
        }
    }

    let modifier_param = modifier_param(ctrl, shift, alt);

    match code {
        KeyCode::Char(c) => {
            let c = if shift { c.to_ascii_uppercase() } else { c };
            Some(c.encode_utf8(&mut [0u8; 4]).as_bytes().to_vec())
        }
        KeyCode::Enter => {
            if alt {
                Some(vec![0x1b, b'\r'])
            } else {
                Some(vec![b'\r'])
            }
        }
        KeyCode::Tab => {
            if shift {
                // Shift+Tab (backtab)
                Some(b"\x1b[Z".to_vec())
            } else {
                Some(vec![b'\t'])
            }
        }
        KeyCode::BackTab => Some(b"\x1b[Z".to_vec()),
        KeyCode::Backspace => {
            if ctrl {
                // Ctrl+Backspace - delete word
                Some(vec![0x17]) // Ctrl+W
            } else if alt {
                Some(vec![0x1b, 0x7f])
            } else {
                Some(vec![0x7f]) // DEL
            }
        }
        KeyCode::Esc => Some(vec![0x1b]),
        KeyCode::Up => Some(cursor_key(b'A', modifier_param, app_cursor)),
        KeyCode::Down => Some(cursor_key(b'B', modifier_param, app_cursor)),
        KeyCode::Right => Some(cursor_key(b'C', modifier_param, app_cursor)),
        KeyCode::Left => Some(cursor_key(b'D', modifier_param, app_cursor)),
        KeyCode::Home => Some(cursor_key(b'H', modifier_param, app_cursor)),
        KeyCode::End => Some(cursor_key(b'F', modifier_param, app_cursor)),
        KeyCode::Insert => Some(tilde_key(2, modifier_param)),
        KeyCode::Delete => Some(tilde_key(3, modifier_param)),
        KeyCode::PageUp => Some(tilde_key(5, modifier_param)),
        KeyCode::PageDown => Some(tilde_key(6, modifier_param)),
        KeyCode::F(n) => {
            // F1-F12 escape sequences
            let base = match n {
                1 => b"\x1bOP".to_vec(),
                2 => b"\x1bOQ".to_vec(),
                3 => b"\x1bOR".to_vec(),
                4 => b"\x1bOS".to_vec(),
                5 => tilde_key(15, modifier_param),
                6 => tilde_key(17, modifier_param),
                7 => tilde_key(18, modifier_param),
                8 => tilde_key(19, modifier_param),
                9 => tilde_key(20, modifier_param),
                10 => tilde_key(21, modifier_param),
                11 => tilde_key(23, modifier_param),
                12 => tilde_key(24, modifier_param),
                _ => return None,
            };
            Some(base)
        }
        _ => None,
    }
}

/// Control byte for Ctrl+`c`, if there is one
fn ctrl_char(c: char) -> Option<u8> {
    let c = c.to_ascii_lowercase();
    if c.is_ascii_lowercase() {
        // Ctrl+A = 0x01, Ctrl+B = 0x02, etc.
        return Some((c as u8) - b'a' + 1);
    }
    match c {
        '[' | '3' => Some(0x1b), // Escape
        '\\' | '4' => Some(0x1c),
        ']' | '5' => Some(0x1d),
        '^' | '6' => Some(0x1e),
        '_' | '7' => Some(0x1f),
        '@' | '2' | ' ' => Some(0x00), // NUL
        '?' => Some(0x7f),             // DEL
        _ => None,
    }
}

/// xterm modifier parameter (`1 + shift + 2*alt + 4*ctrl`), `None` when unmodified
fn modifier_param(ctrl: bool, shift: bool, alt: bool) -> Option<u8> {
    let value = 1 + u8::from(shift) + 2 * u8::from(alt) + 4 * u8::from(ctrl);
    (value > 1).then_some(value)
}

fn cursor_key(final_byte: u8, modifier: Option<u8>, app_cursor: bool) -> Vec<u8> {
    match modifier {
        Some(m) => format!("\x1b[1;{}{}", m, final_byte as char).into_bytes(),
        None if app_cursor => vec![0x1b, b'O', final_byte],
        None => vec![0x1b, b'[', final_byte],
    }
}

fn tilde_key(code: u8, modifier: Option<u8>) -> Vec<u8> {
    match modifier {
        Some(m) => format!("\x1b[{};{}~", code, m).into_bytes(),
        None => format!("\x1b[{}~", code).into_bytes(),
    }
}

/// Encode a mouse report for a grid of `cols` x `rows`.
///
/// Returns `None` for input outside the grid, and in X10 mode for
/// coordinates that encoding cannot represent.
pub fn encode_mouse(input: &MouseInput, encoding: MouseEncoding, cols: u16, rows: u16) -> Option<Vec<u8>> {
    if input.x < 0 || input.y < 0 || input.x >= i32::from(cols) || input.y >= i32::from(rows) {
        return None;
    }
    // Reports are 1-based
    let x = input.x as u32 + 1;
    let y = input.y as u32 + 1;

    let button_code = |button: MouseButton| -> u32 {
        match button {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
        }
    };

    let mut cb = match input.action {
        MouseAction::Click(button) => button_code(button),
        MouseAction::Release(button) => match encoding {
            MouseEncoding::Sgr => button_code(button),
            MouseEncoding::X10 => 3,
        },
        MouseAction::Wheel(WheelDirection::Up) => 64,
        MouseAction::Wheel(WheelDirection::Down) => 65,
        MouseAction::Wheel(WheelDirection::Left) => 66,
        MouseAction::Wheel(WheelDirection::Right) => 67,
        MouseAction::Motion(Some(button)) => button_code(button) | 32,
        MouseAction::Motion(None) => 3 | 32,
    };

    if input.modifiers.contains(KeyModifiers::SHIFT) {
        cb |= 4;
    }
    if input.modifiers.contains(KeyModifiers::ALT) {
        cb |= 8;
    }
    if input.modifiers.contains(KeyModifiers::CONTROL) {
        cb |= 16;
    }

    match encoding {
        MouseEncoding::Sgr => {
            let suffix = if matches!(input.action, MouseAction::Release(_)) {
                'm'
            } else {
                'M'
            };
            Some(format!("\x1b[<{cb};{x};{y}{suffix}").into_bytes())
        }
        MouseEncoding::X10 => {
            if x > X10_MAX_COORD || y > X10_MAX_COORD {
                return None;
            }
            let cb = u8::try_from(cb + 32).ok()?;
            Some(vec![0x1b, b'[', b'M', cb, (x + 32) as u8, (y + 32) as u8])
        }
    }
}

/// Wrap pasted text for the PTY, using bracketed paste when enabled.
pub fn paste_bytes(text: &str, bracketed: bool) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + 12);
    if bracketed {
        bytes.extend_from_slice(b"\x1b[200~");
        // A nested end marker would let the paste escape the bracket
        bytes.extend_from_slice(text.replace("\x1b[201~", "").as_bytes());
        bytes.extend_from_slice(b"\x1b[201~");
    } else {
        // Unbracketed pastes use CR line endings, like typed Enter
        bytes.extend_from_slice(text.replace("\r\n", "\r").replace('\n', "\r").as_bytes());
    }
    bytes
}
