//! Temporary config files handed to embedded tools

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use ratatui::style::Color;

use super::term_dialog::OnClose;
use crate::view::theme::color_to_hex;

/// Write `contents` to a kept temp file named `<prefix>*.yml` and return its path.
pub(super) fn write_temp_config(prefix: &str, contents: &str) -> anyhow::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".yml")
        .tempfile()
        .context("Failed to create temp config file")?;
    file.write_all(contents.as_bytes())
        .context("Failed to write temp config file")?;
    let (_, path) = file.keep().context("Failed to keep temp config file")?;
    Ok(path)
}

/// Callback that deletes the config file, if there is one
pub(super) fn remove_on_close(path: Option<PathBuf>) -> Option<OnClose> {
    let path = path?;
    Some(Box::new(move || {
        remove_quietly(&path);
        None
    }))
}

pub(super) fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::debug!("Failed to remove {}: {}", path.display(), e);
    }
}

/// Quoted YAML color value; colors without a fixed RGB use the tool's default
pub(super) fn yaml_color(color: Color) -> String {
    format!("\"{}\"", color_to_hex(color).unwrap_or_else(|| "default".to_string()))
}
