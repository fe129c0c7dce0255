//! Embedded text editor dialog
//!
//! Runs a terminal editor on a file. When the dialog closes, the file is
//! read back, deleted, and its trimmed content is emitted as an
//! [`EditorResult`].

use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use super::term_dialog::{DialogConfig, TermDialog};
use super::{DialogCmd, DialogId, DialogResult};
use crate::services::terminal::{PtyTerminal, TerminalCommand, TerminalOptions};

pub const DIALOG_ID: &str = "tui_editor";

const DEFAULT_EDITOR: &str = "nvim";

/// Terminal editors that can be embedded
const KNOWN_TUI_EDITORS: &[&str] = &[
    "vim", "nvim", "vi", "nano", "helix", "hx", "micro", "emacs", "joe", "ne", "jed", "kak",
    "pico", "mcedit", "mg", "zile",
];

/// Whether `editor` (a command line, possibly with arguments) runs a known terminal editor
pub fn is_tui_editor(editor: &str) -> bool {
    let Some(program) = editor.split_whitespace().next() else {
        return false;
    };
    Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| KNOWN_TUI_EDITORS.contains(&name))
}

#[derive(Debug, Clone, Default)]
pub struct EditorDialogConfig {
    pub file_path: PathBuf,
    /// Editor command line; `nvim` when empty
    pub editor: String,
    pub working_dir: Option<PathBuf>,
}

/// Outcome of an editor session
#[derive(Debug)]
pub struct EditorResult {
    /// Trimmed file content, or why it could not be read
    pub result: anyhow::Result<String>,
}

impl EditorResult {
    pub fn content(&self) -> Option<&str> {
        self.result.as_deref().ok()
    }
}

/// Build the editor command: the editor's words followed by the file path
pub fn command(config: &EditorDialogConfig) -> TerminalCommand {
    let mut parts = config.editor.split_whitespace();
    let program = parts.next().unwrap_or(DEFAULT_EDITOR);

    TerminalCommand::new(program)
        .args(parts)
        .arg(config.file_path.to_string_lossy())
        .working_dir(config.working_dir.clone())
}

/// Read the edited file, remove it, and wrap the content as a follow-up command
pub fn on_close(path: &Path) -> DialogCmd {
    let result = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))
        .map(|content| content.trim().to_string());
    if let Err(e) = std::fs::remove_file(path) {
        tracing::debug!("Failed to remove {}: {}", path.display(), e);
    }

    DialogCmd::Emit(DialogResult::Editor(EditorResult { result }))
}

/// Create the editor dialog. Cancelling `cancel` kills the editor.
pub fn new_dialog(cancel: CancellationToken, config: EditorDialogConfig, options: TerminalOptions) -> TermDialog {
    let command = command(&config);
    tracing::info!("Opening editor dialog: {}", command.display());
    let file_path = config.file_path;

    TermDialog::new(DialogConfig {
        id: DialogId::from(DIALOG_ID),
        title: "Editor".to_string(),
        loading_msg: Some("Starting editor...".to_string()),
        terminal: Box::new(PtyTerminal::new(command, options, cancel)),
        on_close: Some(Box::new(move || Some(on_close(&file_path)))),
    })
}
