use anyhow::Context;
use crossterm::event::KeyboardEnhancementFlags;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::services::terminal::TerminalOptions;
use crate::view::theme::Theme;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_theme_name")]
    pub theme: String,

    #[serde(default)]
    pub terminal: TerminalConfig,

    #[serde(default)]
    pub editor: EditorConfig,

    #[serde(default)]
    pub keyboard: KeyboardConfig,
}

fn default_theme_name() -> String {
    "dark".to_string()
}

/// Embedded terminal settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalConfig {
    #[serde(default = "default_scrollback_lines")]
    pub scrollback_lines: usize,

    /// `TERM` advertised to embedded programs
    #[serde(default = "default_term")]
    pub term: String,
}

fn default_scrollback_lines() -> usize {
    10_000
}

fn default_term() -> String {
    "xterm-256color".to_string()
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            scrollback_lines: default_scrollback_lines(),
            term: default_term(),
        }
    }
}

impl TerminalConfig {
    /// Options for a new embedded terminal, colored by `theme`
    pub fn options(&self, theme: &Theme) -> TerminalOptions {
        TerminalOptions {
            scrollback_lines: self.scrollback_lines,
            term: self.term.clone(),
            default_fg: theme.terminal_fg,
            default_bg: theme.terminal_bg,
        }
    }
}

/// Embedded editor settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Editor command line; falls back to $VISUAL, $EDITOR, then nvim
    #[serde(default)]
    pub command: Option<String>,
}

impl EditorConfig {
    pub fn resolve_command(&self) -> String {
        self.resolve_command_with(|name| std::env::var(name).ok())
    }

    fn resolve_command_with(&self, env: impl Fn(&str) -> Option<String>) -> String {
        let non_blank = |cmd: &String| !cmd.trim().is_empty();
        self.command
            .clone()
            .filter(non_blank)
            .or_else(|| env("VISUAL").filter(non_blank))
            .or_else(|| env("EDITOR").filter(non_blank))
            .unwrap_or_else(|| "nvim".to_string())
    }
}

/// Keyboard enhancement flags requested from the host terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardConfig {
    /// Enable CSI-u sequences for unambiguous escape code reading.
    #[serde(default = "default_true")]
    pub disambiguate_escape_codes: bool,
    /// Enable key repeat and release events.
    #[serde(default)]
    pub report_event_types: bool,
    /// Enable alternate keycodes.
    #[serde(default = "default_true")]
    pub report_alternate_keys: bool,
    /// Represent all keys as CSI-u escape codes.
    #[serde(default)]
    pub report_all_keys_as_escape_codes: bool,
}

fn default_true() -> bool {
    true
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            disambiguate_escape_codes: true,
            report_event_types: false,
            report_alternate_keys: true,
            report_all_keys_as_escape_codes: false,
        }
    }
}

impl KeyboardConfig {
    /// Build crossterm KeyboardEnhancementFlags from this config.
    pub fn to_flags(&self) -> KeyboardEnhancementFlags {
        let mut flags = KeyboardEnhancementFlags::empty();
        if self.disambiguate_escape_codes {
            flags |= KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES;
        }
        if self.report_event_types {
            flags |= KeyboardEnhancementFlags::REPORT_EVENT_TYPES;
        }
        if self.report_alternate_keys {
            flags |= KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS;
        }
        if self.report_all_keys_as_escape_codes {
            flags |= KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES;
        }
        flags
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme_name(),
            terminal: TerminalConfig::default(),
            editor: EditorConfig::default(),
            keyboard: KeyboardConfig::default(),
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("termdialog").join("config.json"))
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config = Self::load_from_file(&path)?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }
}
