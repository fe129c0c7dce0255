//! Embedded terminal service
//!
//! The dialog layer only knows the [`EmbeddedTerminal`] capability defined
//! here. The production implementation is [`PtyTerminal`], built on:
//! - `portable-pty` for spawning the child on a pseudo-terminal
//! - `alacritty_terminal` for VT parsing and grid management
//!
//! ## Threads
//!
//! A `PtyTerminal` owns two background threads. The reader thread feeds PTY
//! output into the shared grid and wakes whoever awaits [`EmbeddedTerminal::refresh_task`].
//! The waiter thread blocks on the child and publishes its exit status, which
//! resolves [`EmbeddedTerminal::wait_task`]. Neither thread touches UI state.
//!
//! ## Module Responsibilities
//!
//! - `command.rs`: what to run (program, args, cwd, env)
//! - `pty.rs`: key, mouse and paste encoding to PTY bytes
//! - `term.rs`: PTY lifecycle, grid state and rendering

use std::future::Future;
use std::pin::Pin;

use crossterm::event::{KeyEvent, KeyModifiers, MouseButton};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

use crate::view::dialogs::DialogEvent;

pub mod command;
pub mod pty;
pub mod term;

pub use command::TerminalCommand;
pub use term::{PtyTerminal, TerminalOptions};

/// Long-running terminal work the host runs off the UI thread.
///
/// The output event is queued back to the dialog that requested the task.
pub type TerminalTask = Pin<Box<dyn Future<Output = DialogEvent> + Send + 'static>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Classified mouse action forwarded to the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    Click(MouseButton),
    Release(MouseButton),
    Wheel(WheelDirection),
    /// Drag (with the held button) or plain movement
    Motion(Option<MouseButton>),
}

/// Mouse input in terminal-local coordinates.
///
/// Coordinates are signed: a point on the dialog's border or header maps
/// outside the grid and it is up to the terminal to drop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseInput {
    pub action: MouseAction,
    pub x: i32,
    pub y: i32,
    pub modifiers: KeyModifiers,
}

/// A process-backed terminal that can be embedded in a dialog.
///
/// Sending input is fire-and-forget: implementations drop input that cannot
/// be delivered (not started, already closed) and log write failures.
pub trait EmbeddedTerminal: Send {
    /// Whether `start` has succeeded
    fn started(&self) -> bool;

    /// Whether the terminal has been closed or its process has exited
    fn closed(&self) -> bool;

    /// Set the grid size. Valid both before and after `start`.
    fn resize(&mut self, cols: u16, rows: u16) -> anyhow::Result<()>;

    /// Spawn the child process on a PTY sized by the last `resize`.
    fn start(&mut self) -> anyhow::Result<()>;

    /// Send literal text (typed characters)
    fn send_text(&mut self, text: &str);

    /// Send a key that is not plain text (control keys, modified keys)
    fn send_key(&mut self, key: KeyEvent);

    /// Send pasted text, bracketed if the child asked for it
    fn send_paste(&mut self, text: &str);

    fn send_mouse(&mut self, input: MouseInput);

    /// Cursor in grid coordinates, or `None` when hidden or unavailable
    fn cursor_position(&self) -> Option<(u16, u16)>;

    /// Draw the visible screen into `area` of `buf`
    fn render(&self, area: Rect, buf: &mut Buffer);

    /// Stop the child and release the PTY. Calling it twice is harmless.
    fn close(&mut self) -> anyhow::Result<()>;

    /// Task resolving to [`DialogEvent::TerminalExited`] once the process ends
    fn wait_task(&mut self) -> TerminalTask;

    /// Task resolving to [`DialogEvent::TerminalOutput`] once new output arrived
    fn refresh_task(&mut self) -> TerminalTask;
}
