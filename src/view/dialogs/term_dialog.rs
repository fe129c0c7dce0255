//! Generic terminal dialog
//!
//! Owns one [`EmbeddedTerminal`] and its geometry. The terminal is started on
//! the first resize, because only then is its size known; later resizes just
//! resize it. Closing is done by the host via [`TermDialog::close`], which
//! consumes the dialog so the completion callback runs at most once.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Widget};
use unicode_width::UnicodeWidthChar;

use super::layout::{Layout, HEADER_HEIGHT};
use super::{DialogCmd, DialogEvent, DialogId};
use crate::services::terminal::{EmbeddedTerminal, MouseAction, MouseInput, WheelDirection};
use crate::view::theme::Theme;

const DEFAULT_LOADING_MSG: &str = "Starting...";

/// One-shot completion callback run when the dialog closes
pub type OnClose = Box<dyn FnOnce() -> Option<DialogCmd> + Send>;

/// Construction parameters for a [`TermDialog`]
pub struct DialogConfig {
    pub id: DialogId,
    pub title: String,
    /// Shown until the terminal has started; defaults to "Starting..."
    pub loading_msg: Option<String>,
    /// Must not be started yet
    pub terminal: Box<dyn EmbeddedTerminal>,
    pub on_close: Option<OnClose>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShape {
    Block,
    Underline,
    Bar,
}

/// Where and how the host should draw the hardware cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenCursor {
    pub x: u16,
    pub y: u16,
    pub shape: CursorShape,
    pub blink: bool,
    pub color: Color,
}

/// A modal dialog embedding a terminal program
pub struct TermDialog {
    id: DialogId,
    title: String,
    loading_msg: String,
    terminal: Box<dyn EmbeddedTerminal>,
    on_close: Option<OnClose>,
    layout: Layout,
}

impl TermDialog {
    pub fn new(config: DialogConfig) -> Self {
        let loading_msg = config
            .loading_msg
            .filter(|msg| !msg.is_empty())
            .unwrap_or_else(|| DEFAULT_LOADING_MSG.to_string());

        Self {
            id: config.id,
            title: config.title,
            loading_msg,
            terminal: config.terminal,
            on_close: config.on_close,
            layout: Layout::default(),
        }
    }

    pub fn id(&self) -> &DialogId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn loading_msg(&self) -> &str {
        &self.loading_msg
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn is_started(&self) -> bool {
        self.terminal.started()
    }

    /// Route one event. Returns the side effect the host should perform, if any.
    pub fn update(&mut self, event: DialogEvent) -> Option<DialogCmd> {
        match event {
            DialogEvent::Resize { width, height } => self.handle_resize(width, height),
            DialogEvent::TerminalExited => {
                tracing::debug!("Terminal in dialog '{}' exited", self.id);
                Some(DialogCmd::CloseDialog)
            }
            DialogEvent::TerminalOutput => {
                if self.terminal.closed() {
                    None
                } else {
                    Some(DialogCmd::Refresh(self.terminal.refresh_task()))
                }
            }
            DialogEvent::Key(key) => {
                self.handle_key(key);
                None
            }
            DialogEvent::Paste(text) => {
                self.terminal.send_paste(&text);
                None
            }
            DialogEvent::Mouse(mouse) => {
                self.handle_mouse(mouse);
                None
            }
        }
    }

    fn handle_resize(&mut self, host_width: u16, host_height: u16) -> Option<DialogCmd> {
        self.layout = Layout::compute(host_width, host_height);
        let width = self.layout.width;
        let terminal_height = self.layout.terminal_height();

        if !self.terminal.started() && width > 0 && terminal_height > 0 {
            if let Err(e) = self.terminal.resize(width, terminal_height) {
                tracing::warn!("Failed to size terminal for dialog '{}': {:#}", self.id, e);
                return Some(DialogCmd::ReportError(e));
            }
            if let Err(e) = self.terminal.start() {
                tracing::warn!("Failed to start terminal for dialog '{}': {:#}", self.id, e);
                return Some(DialogCmd::ReportError(e));
            }
            tracing::info!(
                "Started terminal for dialog '{}' at {}x{}",
                self.id,
                width,
                terminal_height
            );
            return Some(DialogCmd::Batch(vec![
                DialogCmd::WaitForExit(self.terminal.wait_task()),
                DialogCmd::Refresh(self.terminal.refresh_task()),
            ]));
        }

        if let Err(e) = self.terminal.resize(width, terminal_height) {
            tracing::warn!("Failed to resize terminal for dialog '{}': {:#}", self.id, e);
            return Some(DialogCmd::ReportError(e));
        }
        None
    }

    fn handle_key(&mut self, key: KeyEvent) {
        // Only reported with keyboard enhancement enabled
        if key.kind == KeyEventKind::Release {
            return;
        }
        match key.code {
            KeyCode::Char(c) if (key.modifiers - KeyModifiers::SHIFT).is_empty() => {
                self.terminal.send_text(c.encode_utf8(&mut [0u8; 4]));
            }
            _ => self.terminal.send_key(key),
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let action = match mouse.kind {
            MouseEventKind::Down(button) => MouseAction::Click(button),
            MouseEventKind::Up(button) => MouseAction::Release(button),
            MouseEventKind::Drag(button) => MouseAction::Motion(Some(button)),
            MouseEventKind::Moved => MouseAction::Motion(None),
            MouseEventKind::ScrollUp => MouseAction::Wheel(WheelDirection::Up),
            MouseEventKind::ScrollDown => MouseAction::Wheel(WheelDirection::Down),
            MouseEventKind::ScrollLeft => MouseAction::Wheel(WheelDirection::Left),
            MouseEventKind::ScrollRight => MouseAction::Wheel(WheelDirection::Right),
        };
        let (x, y) = self
            .layout
            .to_terminal(i32::from(mouse.column), i32::from(mouse.row));

        self.terminal.send_mouse(MouseInput {
            action,
            x,
            y,
            modifiers: mouse.modifiers,
        });
    }

    /// Screen position `(row, col)` of the dialog's top-left border cell
    pub fn position(&self) -> (u16, u16) {
        self.layout.position()
    }

    /// Hardware cursor in host-screen coordinates, `None` when the terminal hides it
    pub fn cursor(&self, theme: &Theme) -> Option<ScreenCursor> {
        let (x, y) = self.terminal.cursor_position()?;
        let (x, y) = self.layout.to_screen(i32::from(x), i32::from(y));

        Some(ScreenCursor {
            x: u16::try_from(x).ok()?,
            y: u16::try_from(y).ok()?,
            shape: CursorShape::Block,
            blink: true,
            color: theme.secondary,
        })
    }

    /// Draw the dialog into `buf`, clipped to `area` (the host frame).
    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        if self.layout.width == 0 || area.is_empty() {
            return;
        }
        let dialog_area = clamp_rect_to_bounds(self.layout.area(), area);
        if dialog_area.is_empty() {
            return;
        }

        // Clear the area behind the dialog first to hide underlying content
        Clear.render(dialog_area, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme.border_focus))
            .style(Style::default().fg(theme.fg_base).bg(theme.bg_base));
        let inner = block.inner(dialog_area);
        block.render(dialog_area, buf);

        if inner.is_empty() {
            return;
        }

        let title_width = self.layout.width.saturating_sub(2);
        let header = Rect::new(
            inner.x.saturating_add(1),
            inner.y,
            inner.width.saturating_sub(2).min(title_width),
            1,
        );
        render_title(&self.title, header, buf, theme);

        let header_height = HEADER_HEIGHT.min(inner.height);
        let content = Rect::new(
            inner.x,
            inner.y + header_height,
            inner.width,
            inner.height - header_height,
        );
        if content.is_empty() {
            return;
        }

        if self.terminal.started() {
            self.terminal.render(content, buf);
        } else {
            Paragraph::new(self.loading_msg.as_str())
                .style(Style::default().fg(theme.fg_muted))
                .render(content, buf);
        }
    }

    /// Close the terminal and run the completion callback.
    ///
    /// Terminal close errors are not reported. Returns the callback's follow-up command.
    pub fn close(mut self) -> Option<DialogCmd> {
        if let Err(e) = self.terminal.close() {
            tracing::debug!("Ignoring close error for dialog '{}': {:#}", self.id, e);
        }

        self.on_close.take().and_then(|on_close| on_close())
    }
}

/// Title followed by a `╱` fill, truncated to the header width
fn render_title(title: &str, area: Rect, buf: &mut Buffer, theme: &Theme) {
    let max_width = usize::from(area.width);
    if max_width == 0 {
        return;
    }

    let mut text = String::new();
    let mut used = 0;
    for c in title.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max_width {
            break;
        }
        text.push(c);
        used += w;
    }

    let mut spans = vec![Span::styled(
        text,
        Style::default()
            .fg(theme.primary)
            .add_modifier(Modifier::BOLD),
    )];
    if used + 2 <= max_width {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            "╱".repeat(max_width - used - 1),
            Style::default().fg(theme.fg_subtle),
        ));
    }
    Line::from(spans).render(area, buf);
}

/// Clamp a rectangle to fit within bounds, preventing out-of-bounds rendering panics.
fn clamp_rect_to_bounds(rect: Rect, bounds: Rect) -> Rect {
    let x = rect.x.min(bounds.x + bounds.width.saturating_sub(1));
    let y = rect.y.min(bounds.y + bounds.height.saturating_sub(1));

    let max_width = (bounds.x + bounds.width).saturating_sub(x);
    let max_height = (bounds.y + bounds.height).saturating_sub(y);

    Rect {
        x,
        y,
        width: rect.width.min(max_width),
        height: rect.height.min(max_height),
    }
}
