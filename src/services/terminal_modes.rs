//! Host terminal mode management
//!
//! Puts the host terminal into the state the dialog host needs (raw mode,
//! alternate screen, mouse capture, bracketed paste, keyboard enhancement)
//! and restores it afterwards. `TerminalModes` remembers what it turned on so
//! `undo()` only reverts that.

use anyhow::Result;
use crossterm::{
    cursor::SetCursorStyle,
    event::{
        DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    ExecutableCommand,
};
use std::io::{stdout, Write};

use crate::config::KeyboardConfig;
use crate::view::dialogs::{CursorShape, ScreenCursor};
use crate::view::theme::Theme;

/// Tracks which terminal modes have been enabled and provides cleanup.
#[derive(Debug, Default)]
pub struct TerminalModes {
    raw_mode: bool,
    alternate_screen: bool,
    mouse_capture: bool,
    keyboard_enhancement: bool,
    bracketed_paste: bool,
}

impl TerminalModes {
    /// Enable all terminal modes, checking support for each.
    ///
    /// Raw mode and the alternate screen are required; the rest are best effort.
    /// On error, undoes any partially enabled modes.
    pub fn enable(keyboard: &KeyboardConfig) -> Result<Self> {
        let mut modes = Self::default();

        if let Err(e) = enable_raw_mode() {
            tracing::error!("Failed to enable raw mode: {}", e);
            return Err(e.into());
        }
        modes.raw_mode = true;
        tracing::debug!("Enabled raw mode");

        let flags = keyboard.to_flags();
        if flags.is_empty() {
            tracing::debug!("Keyboard enhancement disabled by config");
        } else {
            match supports_keyboard_enhancement() {
                Ok(true) => match stdout().execute(PushKeyboardEnhancementFlags(flags)) {
                    Ok(_) => {
                        modes.keyboard_enhancement = true;
                        tracing::debug!("Enabled keyboard enhancement flags: {:?}", flags);
                    }
                    Err(e) => tracing::warn!("Failed to enable keyboard enhancement: {}", e),
                },
                Ok(false) => tracing::info!("Keyboard enhancement not supported by terminal"),
                Err(e) => tracing::warn!("Failed to query keyboard enhancement support: {}", e),
            }
        }

        if let Err(e) = stdout().execute(EnterAlternateScreen) {
            tracing::error!("Failed to enter alternate screen: {}", e);
            modes.undo();
            return Err(e.into());
        }
        modes.alternate_screen = true;

        match stdout().execute(EnableMouseCapture) {
            Ok(_) => modes.mouse_capture = true,
            Err(e) => tracing::warn!("Failed to enable mouse capture: {}", e),
        }

        match stdout().execute(EnableBracketedPaste) {
            Ok(_) => modes.bracketed_paste = true,
            Err(e) => tracing::warn!("Failed to enable bracketed paste: {}", e),
        }

        tracing::debug!("Terminal modes enabled: {:?}", modes);
        Ok(modes)
    }

    /// Restore terminal to original state by disabling all enabled modes.
    ///
    /// Safe to call multiple times.
    pub fn undo(&mut self) {
        if std::mem::take(&mut self.mouse_capture) {
            let _ = stdout().execute(DisableMouseCapture);
        }
        if std::mem::take(&mut self.bracketed_paste) {
            let _ = stdout().execute(DisableBracketedPaste);
        }

        let _ = stdout().execute(SetCursorStyle::DefaultUserShape);
        Theme::reset_terminal_cursor_color();

        if std::mem::take(&mut self.keyboard_enhancement) {
            let _ = stdout().execute(PopKeyboardEnhancementFlags);
        }
        // Raw mode goes before leaving the alternate screen for cleaner output
        if std::mem::take(&mut self.raw_mode) {
            let _ = disable_raw_mode();
        }
        if std::mem::take(&mut self.alternate_screen) {
            let _ = stdout().execute(LeaveAlternateScreen);
        }

        let _ = stdout().flush();
        tracing::debug!("Terminal modes restored");
    }

    pub fn keyboard_enhancement_enabled(&self) -> bool {
        self.keyboard_enhancement
    }

    pub fn mouse_capture_enabled(&self) -> bool {
        self.mouse_capture
    }
}

impl Drop for TerminalModes {
    fn drop(&mut self) {
        self.undo();
    }
}

/// crossterm cursor style for a dialog cursor
pub fn cursor_style(cursor: &ScreenCursor) -> SetCursorStyle {
    match (cursor.shape, cursor.blink) {
        (CursorShape::Block, true) => SetCursorStyle::BlinkingBlock,
        (CursorShape::Block, false) => SetCursorStyle::SteadyBlock,
        (CursorShape::Underline, true) => SetCursorStyle::BlinkingUnderScore,
        (CursorShape::Underline, false) => SetCursorStyle::SteadyUnderScore,
        (CursorShape::Bar, true) => SetCursorStyle::BlinkingBar,
        (CursorShape::Bar, false) => SetCursorStyle::SteadyBar,
    }
}

/// Apply the shape and color of a dialog cursor to the host terminal.
pub fn apply_cursor_style(cursor: &ScreenCursor) {
    let _ = stdout().execute(cursor_style(cursor));
    Theme::set_terminal_cursor_color(cursor.color);
}

/// Unconditionally restore terminal state without tracking.
///
/// For panic hooks, which have no access to the `TerminalModes` instance.
pub fn emergency_cleanup() {
    let _ = stdout().execute(DisableMouseCapture);
    let _ = stdout().execute(DisableBracketedPaste);
    let _ = stdout().execute(SetCursorStyle::DefaultUserShape);
    Theme::reset_terminal_cursor_color();
    let _ = stdout().execute(PopKeyboardEnhancementFlags);
    let _ = disable_raw_mode();
    let _ = stdout().execute(LeaveAlternateScreen);
    let _ = stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    #[test]
    fn test_cursor_style_mapping() {
        let mut cursor = ScreenCursor {
            x: 0,
            y: 0,
            shape: CursorShape::Block,
            blink: true,
            color: Color::Reset,
        };
        assert!(matches!(cursor_style(&cursor), SetCursorStyle::BlinkingBlock));

        cursor.blink = false;
        assert!(matches!(cursor_style(&cursor), SetCursorStyle::SteadyBlock));

        cursor.shape = CursorShape::Bar;
        assert!(matches!(cursor_style(&cursor), SetCursorStyle::SteadyBar));
    }
}
