//! Embedded lazygit dialog
//!
//! lazygit gets a temporary config carrying the active theme. The user's own
//! config, when present, is layered underneath it through `LG_CONFIG_FILE`.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use super::term_dialog::{DialogConfig, TermDialog};
use super::themed_config::{remove_on_close, write_temp_config, yaml_color};
use super::DialogId;
use crate::services::terminal::{PtyTerminal, TerminalCommand, TerminalOptions};
use crate::view::theme::Theme;

pub const DIALOG_ID: &str = "lazygit";

const CONFIG_ENV: &str = "LG_CONFIG_FILE";

/// Default location of the user's lazygit config
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lazygit").join("config.yml"))
}

/// Value of `LG_CONFIG_FILE`: the user config first (if it exists), then ours,
/// so the themed settings take precedence.
pub fn build_config_env(themed: &Path, user_config: Option<&Path>) -> String {
    match user_config.filter(|path| path.is_file()) {
        Some(user) => format!("{},{}", user.display(), themed.display()),
        None => themed.display().to_string(),
    }
}

/// lazygit YAML config using the theme's colors
pub fn themed_config(theme: &Theme) -> String {
    format!(
        r#"git:
  autoFetch: true
gui:
  border: rounded
  showFileTree: true
  showRandomTip: false
  showCommandLog: false
  showBottomLine: false
  showPanelJumps: false
  theme:
    activeBorderColor:
      - {active_border}
      - bold
    inactiveBorderColor:
      - {muted}
    searchingActiveBorderColor:
      - {info}
      - bold
    optionsTextColor:
      - {muted}
    selectedLineBgColor:
      - {primary}
    inactiveViewSelectedLineBgColor:
      - {bg_subtle}
    cherryPickedCommitFgColor:
      - {success}
    cherryPickedCommitBgColor:
      - {bg_subtle}
    markedBaseCommitFgColor:
      - {info}
    markedBaseCommitBgColor:
      - {bg_subtle}
    unstagedChangesColor:
      - {error}
    defaultFgColor:
      - default
"#,
        active_border = yaml_color(theme.border_focus),
        muted = yaml_color(theme.fg_muted),
        info = yaml_color(theme.info),
        primary = yaml_color(theme.primary),
        bg_subtle = yaml_color(theme.bg_subtle),
        success = yaml_color(theme.success),
        error = yaml_color(theme.error),
    )
}

/// lazygit command for `working_dir`, pointing it at `themed_config` when given
pub fn command(working_dir: Option<PathBuf>, themed_config: Option<&Path>) -> TerminalCommand {
    let command = TerminalCommand::new("lazygit").working_dir(working_dir);
    match themed_config {
        Some(themed) => {
            let user_config = default_config_path();
            command.env(CONFIG_ENV, build_config_env(themed, user_config.as_deref()))
        }
        None => command,
    }
}

/// Create the lazygit dialog. Cancelling `cancel` kills lazygit.
pub fn new_dialog(
    cancel: CancellationToken,
    working_dir: Option<PathBuf>,
    theme: &Theme,
    options: TerminalOptions,
) -> TermDialog {
    let themed = match write_temp_config("termdialog-lazygit-", &themed_config(theme)) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!("Starting lazygit without a themed config: {:#}", e);
            None
        }
    };
    let command = command(working_dir, themed.as_deref());

    TermDialog::new(DialogConfig {
        id: DialogId::from(DIALOG_ID),
        title: "Lazygit".to_string(),
        loading_msg: Some("Starting lazygit...".to_string()),
        terminal: Box::new(PtyTerminal::new(command, options, cancel)),
        on_close: remove_on_close(themed),
    })
}
