//! Modal dialogs that embed a terminal program
//!
//! A [`TermDialog`] owns one embedded terminal and is driven by the host
//! through a single routing method, [`TermDialog::update`], which takes a
//! tagged [`DialogEvent`] and returns an optional [`DialogCmd`]. Commands are
//! side-effect requests: the host reports errors, spawns the boxed tasks on
//! its runtime, closes the dialog, or forwards results to whoever opened it.
//!
//! Per-destination dialogs ([`editor`], [`lazygit`], [`ghdash`]) are plain
//! builder functions that configure the same generic dialog.

use std::fmt;

use crossterm::event::{KeyEvent, MouseEvent};

use crate::services::terminal::TerminalTask;

pub mod editor;
pub mod ghdash;
pub mod layout;
pub mod lazygit;
pub mod term_dialog;
mod themed_config;

pub use editor::EditorResult;
pub use layout::{Layout, LayoutMode};
pub use term_dialog::{CursorShape, DialogConfig, OnClose, ScreenCursor, TermDialog};

/// Unique key of a dialog in the host's dialog stack
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DialogId(pub String);

impl DialogId {
    pub const fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DialogId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Events a dialog consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogEvent {
    /// The host window changed size (or reported its initial size)
    Resize { width: u16, height: u16 },
    /// The embedded process exited
    TerminalExited,
    /// The embedded terminal has new output to draw
    TerminalOutput,
    Key(KeyEvent),
    Paste(String),
    Mouse(MouseEvent),
}

/// Follow-up results produced by completion callbacks
#[derive(Debug)]
pub enum DialogResult {
    Editor(EditorResult),
}

/// Side effects requested by a dialog
pub enum DialogCmd {
    /// Non-fatal error to surface to the user; the dialog stays open
    ReportError(anyhow::Error),
    /// Resolves once the embedded process has exited
    WaitForExit(TerminalTask),
    /// Resolves once the embedded terminal produced more output
    Refresh(TerminalTask),
    /// Ask the host to remove and close this dialog
    CloseDialog,
    /// Deliver a completion result to the consumer that opened the dialog
    Emit(DialogResult),
    Batch(Vec<DialogCmd>),
}

impl DialogCmd {
    /// Flatten nested batches into a list of leaf commands, preserving order.
    pub fn flatten(self) -> Vec<DialogCmd> {
        match self {
            DialogCmd::Batch(cmds) => cmds.into_iter().flat_map(DialogCmd::flatten).collect(),
            cmd => vec![cmd],
        }
    }
}

impl fmt::Debug for DialogCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialogCmd::ReportError(err) => f.debug_tuple("ReportError").field(err).finish(),
            DialogCmd::WaitForExit(_) => f.write_str("WaitForExit(..)"),
            DialogCmd::Refresh(_) => f.write_str("Refresh(..)"),
            DialogCmd::CloseDialog => f.write_str("CloseDialog"),
            DialogCmd::Emit(result) => f.debug_tuple("Emit").field(result).finish(),
            DialogCmd::Batch(cmds) => f.debug_tuple("Batch").field(cmds).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_nested_batches_keeps_order() {
        let cmd = DialogCmd::Batch(vec![
            DialogCmd::CloseDialog,
            DialogCmd::Batch(vec![
                DialogCmd::ReportError(anyhow::anyhow!("boom")),
                DialogCmd::CloseDialog,
            ]),
        ]);

        let flat = cmd.flatten();
        assert_eq!(flat.len(), 3);
        assert!(matches!(flat[0], DialogCmd::CloseDialog));
        assert!(matches!(flat[1], DialogCmd::ReportError(_)));
        assert!(matches!(flat[2], DialogCmd::CloseDialog));
    }

    #[test]
    fn test_dialog_id_display() {
        let id = DialogId::from("lazygit");
        assert_eq!(id.to_string(), "lazygit");
        assert_eq!(id.as_str(), "lazygit");
    }
}
