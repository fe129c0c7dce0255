//! Dialog host
//!
//! Keeps the stack of open dialogs, feeds them host events, and performs the
//! commands they return: tasks are spawned on the tokio runtime and their
//! results come back through the [`AsyncBridge`], errors land in the status
//! line, and closed dialogs run their completion callbacks.

use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::{Block, Paragraph, Widget};
use ratatui::Frame;

use crate::services::async_bridge::{AsyncBridge, AsyncMessage};
use crate::services::terminal::TerminalTask;
use crate::view::dialogs::{DialogCmd, DialogEvent, DialogId, DialogResult, ScreenCursor, TermDialog};
use crate::view::theme::Theme;

pub struct App {
    /// Open dialogs, topmost last
    dialogs: Vec<TermDialog>,
    theme: Theme,
    runtime: tokio::runtime::Handle,
    bridge: AsyncBridge,
    status_message: Option<String>,
    /// Follow-up results emitted by closed dialogs
    results: Vec<DialogResult>,
    /// Last known host size
    size: (u16, u16),
}

impl App {
    pub fn new(runtime: tokio::runtime::Handle, theme: Theme, width: u16, height: u16) -> Self {
        Self {
            dialogs: Vec::new(),
            theme,
            runtime,
            bridge: AsyncBridge::new(),
            status_message: None,
            results: Vec::new(),
            size: (width, height),
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn dialog_count(&self) -> usize {
        self.dialogs.len()
    }

    pub fn top_dialog(&self) -> Option<&TermDialog> {
        self.dialogs.last()
    }

    /// Nothing left to show
    pub fn should_quit(&self) -> bool {
        self.dialogs.is_empty()
    }

    /// Push a dialog and give it the current host size, which starts its terminal.
    ///
    /// A dialog whose id is already open is closed immediately instead.
    pub fn open_dialog(&mut self, dialog: TermDialog) {
        let id = dialog.id().clone();
        if self.dialogs.iter().any(|d| d.id() == &id) {
            tracing::warn!("Dialog '{}' is already open", id);
            self.status_message = Some(format!("{} is already open", dialog.title()));
            // Its commands must not reach the open dialog sharing the id
            if let Some(cmd) = dialog.close() {
                self.run_rejected_cmd(&id, cmd);
            }
            return;
        }

        tracing::info!("Opening dialog '{}'", id);
        self.dialogs.push(dialog);
        let (width, height) = self.size;
        self.dispatch(&id, DialogEvent::Resize { width, height });
    }

    /// Route a host terminal event. Returns true if a redraw is needed.
    pub fn handle_terminal_event(&mut self, event: CrosstermEvent) -> bool {
        let event = match event {
            CrosstermEvent::Resize(width, height) => {
                self.resize(width, height);
                return true;
            }
            CrosstermEvent::Key(key) => DialogEvent::Key(key),
            CrosstermEvent::Paste(text) => DialogEvent::Paste(text),
            CrosstermEvent::Mouse(mouse) => DialogEvent::Mouse(mouse),
            CrosstermEvent::FocusGained | CrosstermEvent::FocusLost => return false,
        };

        // Only the topmost dialog receives input
        let Some(top) = self.dialogs.last() else {
            return false;
        };
        let id = top.id().clone();

        // A dialog whose program never started has nobody to read Ctrl+C
        if !top.is_started() && is_dismiss_key(&event) {
            self.close_dialog(&id);
            return true;
        }

        self.dispatch(&id, event);
        true
    }

    /// Resize every open dialog
    pub fn resize(&mut self, width: u16, height: u16) {
        self.size = (width, height);
        let ids: Vec<DialogId> = self.dialogs.iter().map(|d| d.id().clone()).collect();
        for id in ids {
            self.dispatch(&id, DialogEvent::Resize { width, height });
        }
    }

    /// Handle results of finished tasks. Returns true if any arrived.
    pub fn process_async_messages(&mut self) -> bool {
        let messages = self.bridge.try_recv_all();
        let any = !messages.is_empty();
        for message in messages {
            match message {
                AsyncMessage::Dialog { id, event } => self.dispatch(&id, event),
            }
        }
        any
    }

    /// Deliver `event` to the dialog `id` and run the command it returns.
    ///
    /// Events for dialogs that are no longer open are dropped.
    pub fn dispatch(&mut self, id: &DialogId, event: DialogEvent) {
        let Some(dialog) = self.dialogs.iter_mut().find(|d| d.id() == id) else {
            tracing::trace!("Dropping {:?} for closed dialog '{}'", event, id);
            return;
        };
        if let Some(cmd) = dialog.update(event) {
            self.run_cmd(id, cmd);
        }
    }

    fn run_cmd(&mut self, id: &DialogId, cmd: DialogCmd) {
        match cmd {
            DialogCmd::ReportError(e) => {
                tracing::error!("Dialog '{}': {:#}", id, e);
                self.status_message = Some(format!("{:#}", e));
            }
            DialogCmd::WaitForExit(task) => {
                // Only issued once a program started, which resolves any earlier error
                self.status_message = None;
                self.spawn_task(id.clone(), task);
            }
            DialogCmd::Refresh(task) => self.spawn_task(id.clone(), task),
            DialogCmd::CloseDialog => self.close_dialog(id),
            DialogCmd::Emit(result) => {
                tracing::debug!("Dialog '{}' emitted {:?}", id, result);
                self.results.push(result);
            }
            DialogCmd::Batch(cmds) => {
                for cmd in cmds {
                    self.run_cmd(id, cmd);
                }
            }
        }
    }

    /// Commands of a dialog that never entered the stack: only results and
    /// errors are meaningful, anything addressed to the dialog is dropped.
    fn run_rejected_cmd(&mut self, id: &DialogId, cmd: DialogCmd) {
        match cmd {
            DialogCmd::ReportError(e) => {
                tracing::error!("Rejected dialog '{}': {:#}", id, e);
                self.status_message = Some(format!("{:#}", e));
            }
            DialogCmd::Emit(result) => self.results.push(result),
            DialogCmd::Batch(cmds) => {
                for cmd in cmds {
                    self.run_rejected_cmd(id, cmd);
                }
            }
            other => tracing::debug!("Ignoring {:?} from rejected dialog '{}'", other, id),
        }
    }

    fn spawn_task(&self, id: DialogId, task: TerminalTask) {
        let sender = self.bridge.sender();
        self.runtime.spawn(async move {
            let event = task.await;
            // The receiver is gone only while the host shuts down
            let _ = sender.send(AsyncMessage::Dialog { id, event });
        });
    }

    /// Remove the dialog `id` from the stack and close it
    pub fn close_dialog(&mut self, id: &DialogId) {
        let Some(index) = self.dialogs.iter().position(|d| d.id() == id) else {
            return;
        };
        let dialog = self.dialogs.remove(index);
        tracing::info!("Closing dialog '{}'", id);
        if let Some(cmd) = dialog.close() {
            self.run_cmd(id, cmd);
        }
    }

    /// Close every open dialog, topmost first
    pub fn close_all(&mut self) {
        while let Some(id) = self.dialogs.last().map(|d| d.id().clone()) {
            self.close_dialog(&id);
        }
    }

    pub fn take_results(&mut self) -> Vec<DialogResult> {
        std::mem::take(&mut self.results)
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let buf = frame.buffer_mut();

        Block::default()
            .style(Style::default().bg(self.theme.bg_base))
            .render(area, buf);

        if let Some(message) = &self.status_message {
            if area.height > 0 {
                let status = Rect::new(area.x, area.y + area.height - 1, area.width, 1);
                Paragraph::new(message.as_str())
                    .style(Style::default().fg(self.theme.error).bg(self.theme.bg_base))
                    .render(status, buf);
            }
        }

        for dialog in &self.dialogs {
            dialog.render(area, buf, &self.theme);
        }
    }

    /// Hardware cursor of the topmost dialog
    pub fn cursor(&self) -> Option<ScreenCursor> {
        self.dialogs.last()?.cursor(&self.theme)
    }
}

fn is_dismiss_key(event: &DialogEvent) -> bool {
    match event {
        DialogEvent::Key(key) if key.kind != KeyEventKind::Release => {
            key.code == KeyCode::Esc
                || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        }
        _ => false,
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::terminal::{EmbeddedTerminal, MouseInput};
    use crate::view::dialogs::{DialogConfig, EditorResult};
    use crossterm::event::KeyEvent;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;
    use ratatui::Terminal;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Shared {
        started: bool,
        closed: bool,
        fail_start: bool,
        exit_immediately: bool,
        text: String,
        sizes: Vec<(u16, u16)>,
    }

    struct FakeTerminal(Arc<Mutex<Shared>>);

    impl EmbeddedTerminal for FakeTerminal {
        fn started(&self) -> bool {
            self.0.lock().unwrap().started
        }
        fn closed(&self) -> bool {
            self.0.lock().unwrap().closed
        }
        fn resize(&mut self, cols: u16, rows: u16) -> anyhow::Result<()> {
            self.0.lock().unwrap().sizes.push((cols, rows));
            Ok(())
        }
        fn start(&mut self) -> anyhow::Result<()> {
            let mut shared = self.0.lock().unwrap();
            if shared.fail_start {
                anyhow::bail!("executable not found");
            }
            shared.started = true;
            Ok(())
        }
        fn send_text(&mut self, text: &str) {
            self.0.lock().unwrap().text.push_str(text);
        }
        fn send_key(&mut self, _key: KeyEvent) {}
        fn send_paste(&mut self, text: &str) {
            self.0.lock().unwrap().text.push_str(text);
        }
        fn send_mouse(&mut self, _input: MouseInput) {}
        fn cursor_position(&self) -> Option<(u16, u16)> {
            Some((0, 0))
        }
        fn render(&self, _area: Rect, _buf: &mut Buffer) {}
        fn close(&mut self) -> anyhow::Result<()> {
            self.0.lock().unwrap().closed = true;
            Ok(())
        }
        fn wait_task(&mut self) -> TerminalTask {
            if self.0.lock().unwrap().exit_immediately {
                Box::pin(async { DialogEvent::TerminalExited })
            } else {
                Box::pin(std::future::pending())
            }
        }
        fn refresh_task(&mut self) -> TerminalTask {
            Box::pin(std::future::pending())
        }
    }

    fn fake_dialog(id: &str, shared: Shared) -> (TermDialog, Arc<Mutex<Shared>>) {
        let shared = Arc::new(Mutex::new(shared));
        let dialog = TermDialog::new(DialogConfig {
            id: DialogId::from(id),
            title: id.to_string(),
            loading_msg: None,
            terminal: Box::new(FakeTerminal(shared.clone())),
            on_close: None,
        });
        (dialog, shared)
    }

    fn wait_for(app: &mut App, mut done: impl FnMut(&App) -> bool) {
        for _ in 0..200 {
            app.process_async_messages();
            if done(app) {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("condition not reached");
    }

    #[test]
    fn test_open_starts_dialog_at_host_size() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = App::new(runtime.handle().clone(), Theme::dark(), 100, 30);
        let (dialog, shared) = fake_dialog("one", Shared::default());

        app.open_dialog(dialog);

        let shared = shared.lock().unwrap();
        assert!(shared.started);
        assert_eq!(shared.sizes, vec![(98, 26)]);
        assert!(!app.should_quit());
    }

    #[test]
    fn test_process_exit_closes_dialog_and_quits() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = App::new(runtime.handle().clone(), Theme::dark(), 100, 30);
        let (dialog, shared) = fake_dialog(
            "one",
            Shared {
                exit_immediately: true,
                ..Default::default()
            },
        );

        app.open_dialog(dialog);
        wait_for(&mut app, App::should_quit);

        assert!(shared.lock().unwrap().closed);
    }

    #[test]
    fn test_start_failure_is_shown_in_status_line() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = App::new(runtime.handle().clone(), Theme::dark(), 200, 60);
        let (dialog, _) = fake_dialog(
            "broken",
            Shared {
                fail_start: true,
                ..Default::default()
            },
        );

        app.open_dialog(dialog);

        assert_eq!(app.status_message(), Some("executable not found"));
        assert_eq!(app.dialog_count(), 1);

        let mut terminal = Terminal::new(TestBackend::new(200, 60)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        assert_eq!(buffer[(15, 4)].symbol(), "╭");
        let status: String = (0..20).map(|x| buffer[(x, 59)].symbol().to_string()).collect();
        assert_eq!(status, "executable not found");
    }

    #[test]
    fn test_escape_dismisses_dialog_that_failed_to_start() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = App::new(runtime.handle().clone(), Theme::dark(), 100, 30);
        let (dialog, shared) = fake_dialog(
            "broken",
            Shared {
                fail_start: true,
                ..Default::default()
            },
        );
        app.open_dialog(dialog);

        app.handle_terminal_event(CrosstermEvent::Key(KeyEvent::new(
            KeyCode::Char('x'),
            KeyModifiers::NONE,
        )));
        assert_eq!(app.dialog_count(), 1);

        app.handle_terminal_event(CrosstermEvent::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )));
        assert!(app.should_quit());
        assert!(shared.lock().unwrap().closed);
    }

    #[test]
    fn test_ctrl_c_reaches_running_program() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = App::new(runtime.handle().clone(), Theme::dark(), 100, 30);
        let (dialog, _) = fake_dialog("running", Shared::default());
        app.open_dialog(dialog);

        app.handle_terminal_event(CrosstermEvent::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )));
        assert_eq!(app.dialog_count(), 1);
    }

    #[test]
    fn test_input_goes_to_topmost_dialog() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = App::new(runtime.handle().clone(), Theme::dark(), 200, 60);
        let (bottom, bottom_shared) = fake_dialog("bottom", Shared::default());
        let (top, top_shared) = fake_dialog("top", Shared::default());
        app.open_dialog(bottom);
        app.open_dialog(top);

        app.handle_terminal_event(CrosstermEvent::Key(KeyEvent::new(
            KeyCode::Char('q'),
            KeyModifiers::NONE,
        )));
        app.handle_terminal_event(CrosstermEvent::Paste("hi".to_string()));

        assert_eq!(top_shared.lock().unwrap().text, "qhi");
        assert_eq!(bottom_shared.lock().unwrap().text, "");
    }

    #[test]
    fn test_resize_reaches_every_dialog() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = App::new(runtime.handle().clone(), Theme::dark(), 200, 60);
        let (a, a_shared) = fake_dialog("a", Shared::default());
        let (b, b_shared) = fake_dialog("b", Shared::default());
        app.open_dialog(a);
        app.open_dialog(b);

        assert!(app.handle_terminal_event(CrosstermEvent::Resize(100, 30)));

        assert_eq!(a_shared.lock().unwrap().sizes.last(), Some(&(98, 26)));
        assert_eq!(b_shared.lock().unwrap().sizes.last(), Some(&(98, 26)));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = App::new(runtime.handle().clone(), Theme::dark(), 100, 30);
        let (first, _) = fake_dialog("same", Shared::default());
        let (second, second_shared) = fake_dialog("same", Shared::default());

        app.open_dialog(first);
        app.open_dialog(second);

        assert_eq!(app.dialog_count(), 1);
        let second_shared = second_shared.lock().unwrap();
        assert!(second_shared.closed);
        assert!(!second_shared.started);
    }

    #[test]
    fn test_rejected_duplicate_cannot_close_open_dialog() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = App::new(runtime.handle().clone(), Theme::dark(), 100, 30);
        let (first, first_shared) = fake_dialog("same", Shared::default());
        app.open_dialog(first);

        app.open_dialog(TermDialog::new(DialogConfig {
            id: DialogId::from("same"),
            title: "Same".to_string(),
            loading_msg: None,
            terminal: Box::new(FakeTerminal(Arc::new(Mutex::new(Shared::default())))),
            on_close: Some(Box::new(|| {
                Some(DialogCmd::Batch(vec![
                    DialogCmd::CloseDialog,
                    DialogCmd::Emit(DialogResult::Editor(EditorResult {
                        result: Ok("kept".to_string()),
                    })),
                ]))
            })),
        }));

        assert_eq!(app.dialog_count(), 1);
        assert!(!first_shared.lock().unwrap().closed);
        assert_eq!(app.take_results().len(), 1);
    }

    #[test]
    fn test_successful_start_clears_previous_error() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = App::new(runtime.handle().clone(), Theme::dark(), 200, 60);
        let (dialog, shared) = fake_dialog(
            "retry",
            Shared {
                fail_start: true,
                ..Default::default()
            },
        );
        app.open_dialog(dialog);
        assert_eq!(app.status_message(), Some("executable not found"));

        shared.lock().unwrap().fail_start = false;
        app.resize(200, 60);

        assert!(shared.lock().unwrap().started);
        assert_eq!(app.status_message(), None);
    }

    #[test]
    fn test_close_collects_emitted_results() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = App::new(runtime.handle().clone(), Theme::dark(), 100, 30);
        let shared = Arc::new(Mutex::new(Shared::default()));
        app.open_dialog(TermDialog::new(DialogConfig {
            id: DialogId::from("editor"),
            title: "Editor".to_string(),
            loading_msg: None,
            terminal: Box::new(FakeTerminal(shared)),
            on_close: Some(Box::new(|| {
                Some(DialogCmd::Emit(DialogResult::Editor(EditorResult {
                    result: Ok("done".to_string()),
                })))
            })),
        }));

        app.close_dialog(&DialogId::from("editor"));

        let results = app.take_results();
        assert_eq!(results.len(), 1);
        let DialogResult::Editor(result) = &results[0];
        assert_eq!(result.content(), Some("done"));
        assert!(app.take_results().is_empty());
        assert!(app.should_quit());
    }

    #[test]
    fn test_events_for_closed_dialogs_are_dropped() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = App::new(runtime.handle().clone(), Theme::dark(), 100, 30);
        app.dispatch(&DialogId::from("gone"), DialogEvent::TerminalExited);
        assert!(app.should_quit());
        assert!(app.cursor().is_none());
    }
}
