//! PTY-backed terminal
//!
//! [`PtyTerminal`] spawns its command on a pseudo-terminal and keeps the
//! screen in an `alacritty_terminal::Term` shared with a reader thread.

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;

use alacritty_terminal::event::{Event, EventListener, WindowSize};
use alacritty_terminal::grid::{Dimensions, Scroll};
use alacritty_terminal::term::cell::Flags;
use alacritty_terminal::term::color::Colors;
use alacritty_terminal::term::{self, Config, Term, TermMode};
use alacritty_terminal::vte::ansi;
use anyhow::{bail, Context};
use crossterm::event::KeyEvent;
use portable_pty::{native_pty_system, ChildKiller, MasterPty, PtySize};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;

use super::pty::{encode_mouse, key_to_pty_bytes, paste_bytes, MouseEncoding};
use super::{EmbeddedTerminal, MouseAction, MouseInput, TerminalCommand, TerminalTask, WheelDirection};
use crate::view::dialogs::DialogEvent;

/// Grid size used until the first resize
const DEFAULT_COLUMNS: u16 = 80;
const DEFAULT_LINES: u16 = 24;
/// Lines scrolled per wheel tick when the child does not capture the mouse
const SCROLL_LINES: i32 = 3;

/// Settings for a [`PtyTerminal`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalOptions {
    pub scrollback_lines: usize,
    /// Value of `TERM` in the child environment
    pub term: String,
    pub default_fg: Color,
    pub default_bg: Color,
}

impl Default for TerminalOptions {
    fn default() -> Self {
        Self {
            scrollback_lines: 10_000,
            term: "xterm-256color".to_string(),
            default_fg: Color::Reset,
            default_bg: Color::Reset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TerminalSize {
    columns: u16,
    screen_lines: u16,
    scrollback_lines: usize,
}

impl TerminalSize {
    fn new(columns: u16, screen_lines: u16, scrollback_lines: usize) -> Self {
        Self {
            columns: columns.max(1),
            screen_lines: screen_lines.max(1),
            scrollback_lines,
        }
    }

    fn pty_size(self) -> PtySize {
        PtySize {
            rows: self.screen_lines,
            cols: self.columns,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

impl Dimensions for TerminalSize {
    fn total_lines(&self) -> usize {
        usize::from(self.screen_lines).saturating_add(self.scrollback_lines)
    }

    fn screen_lines(&self) -> usize {
        usize::from(self.screen_lines)
    }

    fn columns(&self) -> usize {
        usize::from(self.columns)
    }
}

/// Collects alacritty events for the reader thread to answer
#[derive(Clone, Default)]
struct EventProxy {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventProxy {
    fn drain(&self) -> Vec<Event> {
        match self.events.lock() {
            Ok(mut events) => events.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl EventListener for EventProxy {
    fn send_event(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

type SharedWriter = Arc<Mutex<Option<Box<dyn Write + Send>>>>;

/// Handles that only exist while the child runs
struct Running {
    /// Kept alive so the PTY stays open; also used for resize
    master: Box<dyn MasterPty + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
}

/// An [`EmbeddedTerminal`] backed by portable-pty and alacritty_terminal
pub struct PtyTerminal {
    command: TerminalCommand,
    options: TerminalOptions,
    size: TerminalSize,
    term: Arc<Mutex<Term<EventProxy>>>,
    proxy: EventProxy,
    writer: SharedWriter,
    running: Option<Running>,
    /// Signalled by the reader thread after each chunk of output
    output: Arc<Notify>,
    /// Taken by the waiter thread on start
    exit_tx: Option<watch::Sender<Option<u32>>>,
    exit_rx: watch::Receiver<Option<u32>>,
    cancel: CancellationToken,
    started: bool,
    closed: bool,
}

impl PtyTerminal {
    /// Create a terminal for `command`. Nothing is spawned until `start`.
    ///
    /// Cancelling `cancel` kills the child.
    pub fn new(command: TerminalCommand, options: TerminalOptions, cancel: CancellationToken) -> Self {
        let size = TerminalSize::new(DEFAULT_COLUMNS, DEFAULT_LINES, options.scrollback_lines);
        let proxy = EventProxy::default();
        let config = Config {
            scrolling_history: options.scrollback_lines,
            ..Config::default()
        };
        let term = Term::new(config, &size, proxy.clone());
        let (exit_tx, exit_rx) = watch::channel(None);

        Self {
            command,
            options,
            size,
            term: Arc::new(Mutex::new(term)),
            proxy,
            writer: Arc::new(Mutex::new(None)),
            running: None,
            output: Arc::new(Notify::new()),
            exit_tx: Some(exit_tx),
            exit_rx,
            cancel,
            started: false,
            closed: false,
        }
    }

    pub fn command(&self) -> &TerminalCommand {
        &self.command
    }

    /// Exit code of the child, once it has exited
    pub fn exit_code(&self) -> Option<u32> {
        *self.exit_rx.borrow()
    }

    /// Current grid size as `(cols, rows)`
    pub fn size(&self) -> (u16, u16) {
        (self.size.columns, self.size.screen_lines)
    }

    /// Text of the visible screen, one string per row with trailing blanks trimmed
    pub fn screen_text(&self) -> Vec<String> {
        let Ok(term) = self.term.lock() else {
            return Vec::new();
        };
        let content = term.renderable_content();
        let display_offset = content.display_offset as i32;
        let mut rows = vec![String::new(); usize::from(self.size.screen_lines)];
        for indexed in content.display_iter {
            let line = indexed.point.line.0 + display_offset;
            if line < 0 {
                continue;
            }
            if let Some(row) = rows.get_mut(line as usize) {
                if !indexed.cell.flags.contains(Flags::WIDE_CHAR_SPACER) {
                    row.push(indexed.cell.c);
                }
            }
        }
        rows.iter_mut().for_each(|row| {
            let trimmed = row.trim_end().len();
            row.truncate(trimmed);
        });
        rows
    }

    fn mode(&self) -> TermMode {
        match self.term.lock() {
            Ok(term) => *term.mode(),
            Err(_) => TermMode::empty(),
        }
    }

    fn accepts_input(&self) -> bool {
        self.started && !self.closed()
    }

    /// Return to the live screen before the child sees new input
    fn scroll_to_bottom(&self) {
        if let Ok(mut term) = self.term.lock() {
            term.scroll_display(Scroll::Bottom);
        }
    }

    fn write_bytes(&self, bytes: &[u8]) {
        write_to_pty(&self.writer, bytes);
    }
}

fn write_to_pty(writer: &SharedWriter, bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    let Ok(mut guard) = writer.lock() else {
        return;
    };
    let Some(writer) = guard.as_mut() else {
        return;
    };
    if let Err(e) = writer.write_all(bytes).and_then(|_| writer.flush()) {
        tracing::warn!("Failed to write to PTY: {}", e);
    }
}

/// Answer requests the child made through escape sequences
fn answer_terminal_events(proxy: &EventProxy, term: &Mutex<Term<EventProxy>>, writer: &SharedWriter) {
    for event in proxy.drain() {
        match event {
            Event::PtyWrite(text) => write_to_pty(writer, text.as_bytes()),
            Event::TextAreaSizeRequest(format) => {
                let Ok(term) = term.lock() else {
                    continue;
                };
                let window_size = WindowSize {
                    num_lines: term.screen_lines() as u16,
                    num_cols: term.columns() as u16,
                    cell_width: 0,
                    cell_height: 0,
                };
                drop(term);
                write_to_pty(writer, format(window_size).as_bytes());
            }
            Event::Title(title) => tracing::trace!("Terminal title: {}", title),
            _ => {}
        }
    }
}

/// Wait for the exit status; `None` when the waiter went away without one
async fn wait_for_exit(exit_rx: &mut watch::Receiver<Option<u32>>) -> Option<u32> {
    exit_rx.wait_for(Option::is_some).await.ok().and_then(|code| *code)
}

impl EmbeddedTerminal for PtyTerminal {
    fn started(&self) -> bool {
        self.started
    }

    fn closed(&self) -> bool {
        self.closed || self.exit_rx.borrow().is_some()
    }

    fn resize(&mut self, cols: u16, rows: u16) -> anyhow::Result<()> {
        if cols == 0 || rows == 0 {
            bail!("invalid terminal size {}x{}", cols, rows);
        }
        let size = TerminalSize::new(cols, rows, self.options.scrollback_lines);
        if size == self.size {
            return Ok(());
        }

        if let Some(running) = &self.running {
            running
                .master
                .resize(size.pty_size())
                .context("Failed to resize PTY")?;
        }
        match self.term.lock() {
            Ok(mut term) => term.resize(size),
            Err(_) => bail!("terminal state is poisoned"),
        }
        self.size = size;
        Ok(())
    }

    fn start(&mut self) -> anyhow::Result<()> {
        if self.started {
            bail!("terminal already started");
        }
        if self.closed {
            bail!("terminal was closed before it started");
        }

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(self.size.pty_size())
            .context("Failed to open PTY")?;
        let mut reader = pair
            .master
            .try_clone_reader()
            .context("Failed to clone PTY reader")?;
        let writer = pair
            .master
            .take_writer()
            .context("Failed to take PTY writer")?;

        let cmd = self.command.to_command_builder(&self.options.term);
        let mut child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("Failed to spawn '{}'", self.command.display()))?;
        // The child holds its own copy; ours would keep the PTY open after exit
        drop(pair.slave);

        let killer = child.clone_killer();
        if let Ok(mut guard) = self.writer.lock() {
            *guard = Some(writer);
        }

        let term = Arc::clone(&self.term);
        let proxy = self.proxy.clone();
        let writer = Arc::clone(&self.writer);
        let output = Arc::clone(&self.output);
        let reader_spawn = thread::Builder::new()
            .name("termdialog-pty-reader".to_string())
            .spawn(move || {
                let mut parser: ansi::Processor = ansi::Processor::new();
                let mut buf = [0u8; 8192];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            if let Ok(mut term) = term.lock() {
                                parser.advance(&mut *term, &buf[..n]);
                            }
                            answer_terminal_events(&proxy, &term, &writer);
                            output.notify_one();
                        }
                        Err(e) => {
                            tracing::debug!("PTY read ended: {}", e);
                            break;
                        }
                    }
                }
                output.notify_one();
            });

        let exit_tx = self.exit_tx.take();
        let program = self.command.program.clone();
        let waiter_spawn = thread::Builder::new()
            .name("termdialog-pty-waiter".to_string())
            .spawn(move || {
                let code = match child.wait() {
                    Ok(status) => status.exit_code(),
                    Err(e) => {
                        tracing::warn!("Failed to wait for '{}': {}", program, e);
                        1
                    }
                };
                tracing::info!("'{}' exited with code {}", program, code);
                if let Some(exit_tx) = exit_tx {
                    exit_tx.send_replace(Some(code));
                }
            });

        let mut killer = killer;
        if let Err(e) = reader_spawn.and(waiter_spawn) {
            if let Err(kill_err) = killer.kill() {
                tracing::debug!("Failed to kill child after thread spawn error: {}", kill_err);
            }
            return Err(e).context("Failed to spawn PTY threads");
        }

        tracing::info!(
            "Started '{}' in a {}x{} PTY",
            self.command.display(),
            self.size.columns,
            self.size.screen_lines
        );
        self.running = Some(Running {
            master: pair.master,
            killer,
        });
        self.started = true;
        Ok(())
    }

    fn send_text(&mut self, text: &str) {
        if !self.accepts_input() {
            return;
        }
        self.scroll_to_bottom();
        self.write_bytes(text.as_bytes());
    }

    fn send_key(&mut self, key: KeyEvent) {
        if !self.accepts_input() {
            return;
        }
        let app_cursor = self.mode().contains(TermMode::APP_CURSOR);
        match key_to_pty_bytes(key.code, key.modifiers, app_cursor) {
            Some(bytes) => {
                self.scroll_to_bottom();
                self.write_bytes(&bytes);
            }
            None => tracing::trace!("No PTY encoding for {:?}", key),
        }
    }

    fn send_paste(&mut self, text: &str) {
        if !self.accepts_input() {
            return;
        }
        let bracketed = self.mode().contains(TermMode::BRACKETED_PASTE);
        self.scroll_to_bottom();
        self.write_bytes(&paste_bytes(text, bracketed));
    }

    fn send_mouse(&mut self, input: MouseInput) {
        if !self.accepts_input() {
            return;
        }
        let mode = self.mode();

        if !mode.intersects(TermMode::MOUSE_MODE) {
            // Child does not capture the mouse: the wheel scrolls our history
            let delta = match input.action {
                MouseAction::Wheel(WheelDirection::Up) => SCROLL_LINES,
                MouseAction::Wheel(WheelDirection::Down) => -SCROLL_LINES,
                _ => return,
            };
            if let Ok(mut term) = self.term.lock() {
                term.scroll_display(Scroll::Delta(delta));
            }
            return;
        }

        let wanted = match input.action {
            MouseAction::Motion(None) => mode.contains(TermMode::MOUSE_MOTION),
            MouseAction::Motion(Some(_)) => {
                mode.intersects(TermMode::MOUSE_MOTION | TermMode::MOUSE_DRAG)
            }
            _ => true,
        };
        if !wanted {
            return;
        }

        let encoding = if mode.contains(TermMode::SGR_MOUSE) {
            MouseEncoding::Sgr
        } else {
            MouseEncoding::X10
        };
        if let Some(bytes) = encode_mouse(&input, encoding, self.size.columns, self.size.screen_lines) {
            self.write_bytes(&bytes);
        }
    }

    fn cursor_position(&self) -> Option<(u16, u16)> {
        let term = self.term.lock().ok()?;
        let content = term.renderable_content();
        if content.cursor.shape == ansi::CursorShape::Hidden {
            return None;
        }
        let point = term::point_to_viewport(content.display_offset, content.cursor.point)?;
        let col = u16::try_from(point.column.0).ok()?;
        let row = u16::try_from(point.line).ok()?;
        (col < self.size.columns && row < self.size.screen_lines).then_some((col, row))
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let area = area.intersection(buf.area);
        if area.is_empty() {
            return;
        }
        let default_fg = self.options.default_fg;
        let default_bg = self.options.default_bg;
        buf.set_style(area, Style::default().fg(default_fg).bg(default_bg));

        let Ok(term) = self.term.lock() else {
            return;
        };
        let content = term.renderable_content();
        let display_offset = content.display_offset as i32;

        for indexed in content.display_iter {
            let line = indexed.point.line.0 + display_offset;
            if line < 0 || line >= i32::from(area.height) {
                continue;
            }
            let col = indexed.point.column.0;
            if col >= usize::from(area.width) {
                continue;
            }
            let cell = indexed.cell;
            let flags = cell.flags;

            // Build style from cell attributes, using theme defaults
            let mut style = Style::default()
                .fg(to_ratatui_color(cell.fg, content.colors, default_fg, default_bg))
                .bg(to_ratatui_color(cell.bg, content.colors, default_fg, default_bg));
            if flags.contains(Flags::BOLD) {
                style = style.add_modifier(Modifier::BOLD);
            }
            if flags.contains(Flags::ITALIC) {
                style = style.add_modifier(Modifier::ITALIC);
            }
            if flags.contains(Flags::DIM) {
                style = style.add_modifier(Modifier::DIM);
            }
            if flags.intersects(Flags::ALL_UNDERLINES) {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            if flags.contains(Flags::STRIKEOUT) {
                style = style.add_modifier(Modifier::CROSSED_OUT);
            }
            if flags.contains(Flags::INVERSE) {
                style = style.add_modifier(Modifier::REVERSED);
            }

            let hidden = flags.intersects(
                Flags::HIDDEN | Flags::WIDE_CHAR_SPACER | Flags::LEADING_WIDE_CHAR_SPACER,
            );
            let mut symbol = String::new();
            if hidden {
                symbol.push(' ');
            } else {
                symbol.push(cell.c);
                if let Some(extra) = cell.zerowidth() {
                    symbol.extend(extra);
                }
            }

            let x = area.x + col as u16;
            let y = area.y + line as u16;
            if let Some(target) = buf.cell_mut((x, y)) {
                target.set_symbol(&symbol);
                target.set_style(style);
            }
        }
    }

    fn close(&mut self) -> anyhow::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Ok(mut writer) = self.writer.lock() {
            writer.take();
        }
        if let Some(mut running) = self.running.take() {
            if self.exit_rx.borrow().is_none() {
                running
                    .killer
                    .kill()
                    .with_context(|| format!("Failed to kill '{}'", self.command.program))?;
            }
        }
        Ok(())
    }

    fn wait_task(&mut self) -> TerminalTask {
        let mut exit_rx = self.exit_rx.clone();
        let cancel = self.cancel.clone();
        let killer = self.running.as_ref().map(|running| running.killer.clone_killer());
        let program = self.command.program.clone();

        Box::pin(async move {
            let cancelled = tokio::select! {
                _ = wait_for_exit(&mut exit_rx) => false,
                _ = cancel.cancelled() => true,
            };
            if cancelled {
                tracing::debug!("Cancelled, killing '{}'", program);
                if let Some(mut killer) = killer {
                    if let Err(e) = killer.kill() {
                        tracing::debug!("Failed to kill '{}': {}", program, e);
                    }
                }
                wait_for_exit(&mut exit_rx).await;
            }
            DialogEvent::TerminalExited
        })
    }

    fn refresh_task(&mut self) -> TerminalTask {
        let output = Arc::clone(&self.output);
        let mut exit_rx = self.exit_rx.clone();

        Box::pin(async move {
            tokio::select! {
                _ = output.notified() => {}
                _ = wait_for_exit(&mut exit_rx) => {}
            }
            DialogEvent::TerminalOutput
        })
    }
}

impl Drop for PtyTerminal {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::debug!("Error closing terminal on drop: {}", e);
        }
    }
}

fn to_ratatui_color(color: ansi::Color, colors: &Colors, default_fg: Color, default_bg: Color) -> Color {
    use ansi::NamedColor;

    match color {
        ansi::Color::Spec(rgb) => Color::Rgb(rgb.r, rgb.g, rgb.b),
        ansi::Color::Indexed(idx) => match colors[usize::from(idx)] {
            Some(rgb) => Color::Rgb(rgb.r, rgb.g, rgb.b),
            None => Color::Indexed(idx),
        },
        ansi::Color::Named(named) => {
            if let Some(rgb) = colors[named] {
                return Color::Rgb(rgb.r, rgb.g, rgb.b);
            }
            match named {
                NamedColor::Black | NamedColor::DimBlack => Color::Black,
                NamedColor::Red | NamedColor::DimRed => Color::Red,
                NamedColor::Green | NamedColor::DimGreen => Color::Green,
                NamedColor::Yellow | NamedColor::DimYellow => Color::Yellow,
                NamedColor::Blue | NamedColor::DimBlue => Color::Blue,
                NamedColor::Magenta | NamedColor::DimMagenta => Color::Magenta,
                NamedColor::Cyan | NamedColor::DimCyan => Color::Cyan,
                NamedColor::White | NamedColor::DimWhite => Color::Gray,
                NamedColor::BrightBlack => Color::DarkGray,
                NamedColor::BrightRed => Color::LightRed,
                NamedColor::BrightGreen => Color::LightGreen,
                NamedColor::BrightYellow => Color::LightYellow,
                NamedColor::BrightBlue => Color::LightBlue,
                NamedColor::BrightMagenta => Color::LightMagenta,
                NamedColor::BrightCyan => Color::LightCyan,
                NamedColor::BrightWhite => Color::White,
                NamedColor::Background => default_bg,
                NamedColor::Foreground
                | NamedColor::BrightForeground
                | NamedColor::DimForeground
                | NamedColor::Cursor => default_fg,
            }
        }
    }
}
