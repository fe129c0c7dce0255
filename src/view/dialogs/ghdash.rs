//! Embedded GitHub dashboard (`gh dash`) dialog

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use super::term_dialog::{DialogConfig, TermDialog};
use super::themed_config::{remove_on_close, write_temp_config, yaml_color};
use super::DialogId;
use crate::services::terminal::{PtyTerminal, TerminalCommand, TerminalOptions};
use crate::view::theme::Theme;

pub const DIALOG_ID: &str = "ghdash";

/// gh-dash YAML config using the theme's colors
pub fn themed_config(theme: &Theme) -> String {
    format!(
        r#"theme:
  colors:
    text:
      primary: {fg_base}
      secondary: {fg_muted}
      inverted: {fg_selected}
      faint: {fg_subtle}
      warning: {warning}
      success: {success}
      error: {error}
    background:
      selected: {primary}
    border:
      primary: {border_focus}
      secondary: {fg_muted}
      faint: {bg_subtle}
"#,
        fg_base = yaml_color(theme.fg_base),
        fg_muted = yaml_color(theme.fg_muted),
        fg_selected = yaml_color(theme.fg_selected),
        fg_subtle = yaml_color(theme.fg_subtle),
        warning = yaml_color(theme.warning),
        success = yaml_color(theme.success),
        error = yaml_color(theme.error),
        primary = yaml_color(theme.primary),
        border_focus = yaml_color(theme.border_focus),
        bg_subtle = yaml_color(theme.bg_subtle),
    )
}

pub fn command(working_dir: Option<PathBuf>, themed_config: Option<&Path>) -> TerminalCommand {
    let command = TerminalCommand::new("gh").arg("dash").working_dir(working_dir);
    match themed_config {
        Some(path) => command.arg("--config").arg(path.to_string_lossy()),
        None => command,
    }
}

/// Create the gh-dash dialog. Cancelling `cancel` kills gh-dash.
pub fn new_dialog(
    cancel: CancellationToken,
    working_dir: Option<PathBuf>,
    theme: &Theme,
    options: TerminalOptions,
) -> TermDialog {
    let themed = match write_temp_config("termdialog-ghdash-", &themed_config(theme)) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!("Starting gh-dash without a themed config: {:#}", e);
            None
        }
    };
    let command = command(working_dir, themed.as_deref());

    TermDialog::new(DialogConfig {
        id: DialogId::from(DIALOG_ID),
        title: "GitHub Dashboard".to_string(),
        loading_msg: Some("Starting gh-dash...".to_string()),
        terminal: Box::new(PtyTerminal::new(command, options, cancel)),
        on_close: remove_on_close(themed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_passes_config() {
        let cmd = command(None, Some(Path::new("/tmp/dash.yml")));
        assert_eq!(cmd.program, "gh");
        assert_eq!(cmd.args, vec!["dash", "--config", "/tmp/dash.yml"]);

        let cmd = command(None, None);
        assert_eq!(cmd.args, vec!["dash"]);
    }

    #[test]
    fn test_themed_config_uses_theme_colors() {
        let theme = Theme::dark();
        let config = themed_config(&theme);
        assert!(config.starts_with("theme:\n  colors:\n"));
        assert!(config.contains("primary: \"#dfdbdd\""));
        assert!(config.contains("selected: \"#6a50ff\""));
        assert!(config.contains("faint: \"#3a3943\""));
    }

    #[test]
    fn test_new_dialog_metadata() {
        let dialog = new_dialog(
            CancellationToken::new(),
            Some(PathBuf::from("/tmp")),
            &Theme::light(),
            TerminalOptions::default(),
        );
        assert_eq!(dialog.id().as_str(), DIALOG_ID);
        assert_eq!(dialog.title(), "GitHub Dashboard");
        assert_eq!(dialog.loading_msg(), "Starting gh-dash...");
        assert!(dialog.close().is_none());
    }
}
