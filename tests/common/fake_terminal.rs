//! Scripted in-memory terminal for driving dialogs without a PTY

use std::sync::{Arc, Mutex};

use crossterm::event::KeyEvent;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use tokio::sync::Notify;

use termdialog::services::terminal::{EmbeddedTerminal, MouseInput, TerminalTask};
use termdialog::view::dialogs::DialogEvent;

/// Everything the dialog asked the terminal to do, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Resize(u16, u16),
    Start,
    Text(String),
    Key(KeyEvent),
    Paste(String),
    Mouse(MouseInput),
    Close,
}

#[derive(Debug, Default)]
pub struct Script {
    pub calls: Vec<Call>,
    pub started: bool,
    pub closed: bool,
    /// Number of upcoming `start` calls that fail
    pub start_failures: usize,
    pub fail_resize: bool,
    pub fail_close: bool,
    pub cursor: Option<(u16, u16)>,
    /// Text drawn at the top-left of the render area
    pub screen: String,
}

/// Handle for scripting a [`FakeTerminal`] after it was boxed into a dialog
#[derive(Clone)]
pub struct FakeHandle {
    script: Arc<Mutex<Script>>,
    exit: Arc<Notify>,
    output: Arc<Notify>,
}

impl FakeHandle {
    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn with_script(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.script.lock().unwrap());
    }

    pub fn is_started(&self) -> bool {
        self.script.lock().unwrap().started
    }

    pub fn is_closed(&self) -> bool {
        self.script.lock().unwrap().closed
    }

    /// Simulate the child exiting
    pub fn exit(&self) {
        self.script.lock().unwrap().closed = true;
        self.exit.notify_one();
    }

    /// Simulate the child printing something
    pub fn print(&self, text: &str) {
        self.script.lock().unwrap().screen = text.to_string();
        self.output.notify_one();
    }
}

pub struct FakeTerminal {
    handle: FakeHandle,
}

impl FakeTerminal {
    pub fn new() -> (Box<dyn EmbeddedTerminal>, FakeHandle) {
        let handle = FakeHandle {
            script: Arc::new(Mutex::new(Script::default())),
            exit: Arc::new(Notify::new()),
            output: Arc::new(Notify::new()),
        };
        (
            Box::new(Self {
                handle: handle.clone(),
            }),
            handle,
        )
    }

    fn record(&self, call: Call) {
        self.handle.script.lock().unwrap().calls.push(call);
    }
}

impl EmbeddedTerminal for FakeTerminal {
    fn started(&self) -> bool {
        self.handle.is_started()
    }

    fn closed(&self) -> bool {
        self.handle.is_closed()
    }

    fn resize(&mut self, cols: u16, rows: u16) -> anyhow::Result<()> {
        self.record(Call::Resize(cols, rows));
        if self.handle.script.lock().unwrap().fail_resize {
            anyhow::bail!("resize rejected");
        }
        Ok(())
    }

    fn start(&mut self) -> anyhow::Result<()> {
        self.record(Call::Start);
        let mut script = self.handle.script.lock().unwrap();
        if script.start_failures > 0 {
            script.start_failures -= 1;
            anyhow::bail!("command not found");
        }
        script.started = true;
        Ok(())
    }

    fn send_text(&mut self, text: &str) {
        self.record(Call::Text(text.to_string()));
    }

    fn send_key(&mut self, key: KeyEvent) {
        self.record(Call::Key(key));
    }

    fn send_paste(&mut self, text: &str) {
        self.record(Call::Paste(text.to_string()));
    }

    fn send_mouse(&mut self, input: MouseInput) {
        self.record(Call::Mouse(input));
    }

    fn cursor_position(&self) -> Option<(u16, u16)> {
        self.handle.script.lock().unwrap().cursor
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let screen = self.handle.script.lock().unwrap().screen.clone();
        buf.set_stringn(area.x, area.y, screen, usize::from(area.width), Style::default());
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.record(Call::Close);
        let mut script = self.handle.script.lock().unwrap();
        script.closed = true;
        if script.fail_close {
            anyhow::bail!("process already reaped");
        }
        Ok(())
    }

    fn wait_task(&mut self) -> TerminalTask {
        let exit = Arc::clone(&self.handle.exit);
        Box::pin(async move {
            exit.notified().await;
            DialogEvent::TerminalExited
        })
    }

    fn refresh_task(&mut self) -> TerminalTask {
        let output = Arc::clone(&self.handle.output);
        let exit = Arc::clone(&self.handle.exit);
        Box::pin(async move {
            tokio::select! {
                _ = output.notified() => {}
                _ = exit.notified() => {}
            }
            DialogEvent::TerminalOutput
        })
    }
}
