use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable color representation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ColorDef {
    /// RGB color as [r, g, b]
    Rgb(u8, u8, u8),
    /// Named color or "#rrggbb"
    Named(String),
}

impl From<ColorDef> for Color {
    fn from(def: ColorDef) -> Self {
        match def {
            ColorDef::Rgb(r, g, b) => Color::Rgb(r, g, b),
            ColorDef::Named(name) => {
                if let Some((r, g, b)) = parse_hex(&name) {
                    return Color::Rgb(r, g, b);
                }
                match name.as_str() {
                    "Black" => Color::Black,
                    "Red" => Color::Red,
                    "Green" => Color::Green,
                    "Yellow" => Color::Yellow,
                    "Blue" => Color::Blue,
                    "Magenta" => Color::Magenta,
                    "Cyan" => Color::Cyan,
                    "Gray" => Color::Gray,
                    "DarkGray" => Color::DarkGray,
                    "LightRed" => Color::LightRed,
                    "LightGreen" => Color::LightGreen,
                    "LightYellow" => Color::LightYellow,
                    "LightBlue" => Color::LightBlue,
                    "LightMagenta" => Color::LightMagenta,
                    "LightCyan" => Color::LightCyan,
                    "White" => Color::White,
                    // Default/Reset uses the terminal's default color (preserves transparency)
                    "Default" | "Reset" => Color::Reset,
                    _ => Color::White, // Default fallback
                }
            }
        }
    }
}

fn parse_hex(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Serializable theme definition (matches JSON structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ThemeFile {
    name: String,
    fg: FgColors,
    bg: BgColors,
    accent: AccentColors,
    status: StatusColors,
    terminal: TerminalColors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FgColors {
    base: ColorDef,
    muted: ColorDef,
    subtle: ColorDef,
    selected: ColorDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BgColors {
    base: ColorDef,
    subtle: ColorDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccentColors {
    primary: ColorDef,
    secondary: ColorDef,
    border_focus: ColorDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StatusColors {
    info: ColorDef,
    success: ColorDef,
    warning: ColorDef,
    error: ColorDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TerminalColors {
    #[serde(default = "default_terminal_fg")]
    fg: ColorDef,
    #[serde(default = "default_terminal_bg")]
    bg: ColorDef,
}

fn default_terminal_fg() -> ColorDef {
    ColorDef::Named("Default".to_string())
}
fn default_terminal_bg() -> ColorDef {
    ColorDef::Named("Default".to_string())
}

/// Colors used by dialogs and by the themed configs handed to embedded tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub name: String,

    pub fg_base: Color,
    pub fg_muted: Color,
    pub fg_subtle: Color,
    /// Text drawn on top of `primary`
    pub fg_selected: Color,

    pub bg_base: Color,
    pub bg_subtle: Color,

    pub primary: Color,
    /// Embedded terminal cursor
    pub secondary: Color,
    pub border_focus: Color,

    pub info: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,

    /// Default colors of the embedded terminal
    pub terminal_fg: Color,
    pub terminal_bg: Color,
}

impl From<ThemeFile> for Theme {
    fn from(file: ThemeFile) -> Self {
        Self {
            name: file.name,
            fg_base: file.fg.base.into(),
            fg_muted: file.fg.muted.into(),
            fg_subtle: file.fg.subtle.into(),
            fg_selected: file.fg.selected.into(),
            bg_base: file.bg.base.into(),
            bg_subtle: file.bg.subtle.into(),
            primary: file.accent.primary.into(),
            secondary: file.accent.secondary.into(),
            border_focus: file.accent.border_focus.into(),
            info: file.status.info.into(),
            success: file.status.success.into(),
            warning: file.status.warning.into(),
            error: file.status.error.into(),
            terminal_fg: file.terminal.fg.into(),
            terminal_bg: file.terminal.bg.into(),
        }
    }
}

impl Theme {
    /// Load theme from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        use anyhow::Context;

        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read theme file {}", path.display()))?;
        let theme_file: ThemeFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse theme file {}", path.display()))?;
        Ok(theme_file.into())
    }

    fn user_themes_dir() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("termdialog").join("themes"))
    }

    /// Load a user theme from the config directory
    fn load_user_theme(name: &str) -> Option<Self> {
        let path = Self::user_themes_dir()?.join(format!("{}.json", name));
        if !path.exists() {
            return None;
        }
        match Self::from_file(&path) {
            Ok(theme) => Some(theme),
            Err(e) => {
                tracing::warn!("Ignoring theme {}: {:#}", path.display(), e);
                None
            }
        }
    }

    /// Default dark theme
    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),

            fg_base: Color::Rgb(223, 219, 221),
            fg_muted: Color::Rgb(133, 131, 146),
            fg_subtle: Color::Rgb(96, 95, 107),
            fg_selected: Color::Rgb(241, 239, 239),

            bg_base: Color::Rgb(32, 31, 38),
            bg_subtle: Color::Rgb(58, 57, 67),

            primary: Color::Rgb(106, 80, 255),
            secondary: Color::Rgb(255, 96, 255),
            border_focus: Color::Rgb(134, 113, 255),

            info: Color::Rgb(0, 162, 255),
            success: Color::Rgb(18, 199, 143),
            warning: Color::Rgb(255, 152, 90),
            error: Color::Rgb(235, 66, 104),

            terminal_fg: Color::Reset,
            terminal_bg: Color::Reset,
        }
    }

    /// Light theme
    pub fn light() -> Self {
        Self {
            name: "light".to_string(),

            fg_base: Color::Rgb(32, 31, 38),
            fg_muted: Color::Rgb(96, 95, 107),
            fg_subtle: Color::Rgb(133, 131, 146),
            fg_selected: Color::Rgb(255, 255, 255),

            bg_base: Color::Rgb(250, 250, 250),
            bg_subtle: Color::Rgb(228, 228, 232),

            primary: Color::Rgb(91, 63, 240),
            secondary: Color::Rgb(200, 40, 200),
            border_focus: Color::Rgb(91, 63, 240),

            info: Color::Rgb(0, 120, 212),
            success: Color::Rgb(16, 124, 16),
            warning: Color::Rgb(202, 80, 16),
            error: Color::Rgb(196, 43, 28),

            terminal_fg: Color::Reset,
            terminal_bg: Color::Reset,
        }
    }

    /// High contrast theme using the terminal's own palette
    pub fn high_contrast() -> Self {
        Self {
            name: "high-contrast".to_string(),

            fg_base: Color::White,
            fg_muted: Color::Gray,
            fg_subtle: Color::DarkGray,
            fg_selected: Color::Black,

            bg_base: Color::Black,
            bg_subtle: Color::DarkGray,

            primary: Color::LightYellow,
            secondary: Color::LightCyan,
            border_focus: Color::LightYellow,

            info: Color::LightBlue,
            success: Color::LightGreen,
            warning: Color::Yellow,
            error: Color::LightRed,

            terminal_fg: Color::White,
            terminal_bg: Color::Black,
        }
    }

    /// Get a theme by name, defaults to dark if not found
    /// User themes override the builtin ones
    pub fn from_name(name: &str) -> Self {
        let normalized_name = name.to_lowercase().replace('_', "-");

        if let Some(theme) = Self::load_user_theme(&normalized_name) {
            return theme;
        }

        match normalized_name.as_str() {
            "light" => Self::light(),
            "high-contrast" => Self::high_contrast(),
            "dark" => Self::dark(),
            _ => {
                tracing::warn!("Unknown theme '{}', using dark", name);
                Self::dark()
            }
        }
    }

    /// Get all available theme names (builtin + user themes)
    pub fn available_themes() -> Vec<String> {
        let mut themes: Vec<String> = vec![
            "dark".to_string(),
            "light".to_string(),
            "high-contrast".to_string(),
        ];

        // Scan user themes directory
        if let Some(user_themes_dir) = Self::user_themes_dir() {
            if let Ok(entries) = std::fs::read_dir(&user_themes_dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.extension().is_some_and(|ext| ext == "json") {
                        if let Some(stem) = path.file_stem() {
                            let name = stem.to_string_lossy().to_string();
                            // Avoid duplicates (user theme overriding builtin)
                            if !themes.iter().any(|t| t == &name) {
                                themes.push(name);
                            }
                        }
                    }
                }
            }
        }

        themes
    }

    /// Set the terminal cursor color using OSC 12 escape sequence.
    pub fn set_terminal_cursor_color(color: Color) {
        use std::io::Write;
        if let Some(hex) = color_to_hex(color) {
            // OSC 12 sets cursor color: \x1b]12;#RRGGBB\x07
            let _ = write!(std::io::stdout(), "\x1b]12;{}\x07", hex);
            let _ = std::io::stdout().flush();
        }
    }

    /// Reset the terminal cursor color to default.
    pub fn reset_terminal_cursor_color() {
        use std::io::Write;
        // OSC 112 resets cursor color to default
        let _ = write!(std::io::stdout(), "\x1b]112\x07");
        let _ = std::io::stdout().flush();
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

/// RGB value of a color, using the xterm defaults for the 16 ANSI colors
pub fn color_to_rgb(color: Color) -> Option<(u8, u8, u8)> {
    let rgb = match color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Black => (0, 0, 0),
        Color::Red => (205, 0, 0),
        Color::Green => (0, 205, 0),
        Color::Yellow => (205, 205, 0),
        Color::Blue => (0, 0, 238),
        Color::Magenta => (205, 0, 205),
        Color::Cyan => (0, 205, 205),
        Color::Gray => (229, 229, 229),
        Color::DarkGray => (127, 127, 127),
        Color::LightRed => (255, 0, 0),
        Color::LightGreen => (0, 255, 0),
        Color::LightYellow => (255, 255, 0),
        Color::LightBlue => (92, 92, 255),
        Color::LightMagenta => (255, 0, 255),
        Color::LightCyan => (0, 255, 255),
        Color::White => (255, 255, 255),
        Color::Indexed(_) | Color::Reset => return None,
    };
    Some(rgb)
}

/// `#rrggbb` form of a color, `None` for colors without a fixed value
pub fn color_to_hex(color: Color) -> Option<String> {
    color_to_rgb(color).map(|(r, g, b)| format!("#{:02x}{:02x}{:02x}", r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_creation() {
        let dark = Theme::dark();
        assert_eq!(dark.name, "dark");

        let light = Theme::light();
        assert_eq!(light.name, "light");

        let high_contrast = Theme::high_contrast();
        assert_eq!(high_contrast.name, "high-contrast");
    }

    #[test]
    fn test_theme_from_name() {
        let theme = Theme::from_name("light");
        assert_eq!(theme.name, "light");

        let theme = Theme::from_name("High_Contrast");
        assert_eq!(theme.name, "high-contrast");

        let theme = Theme::from_name("unknown-theme-name");
        assert_eq!(theme.name, "dark");
    }

    #[test]
    fn test_available_themes() {
        let themes = Theme::available_themes();
        assert!(themes.len() >= 3);
        assert!(themes.contains(&"dark".to_string()));
        assert!(themes.contains(&"light".to_string()));
        assert!(themes.contains(&"high-contrast".to_string()));
    }

    #[test]
    fn test_default_reset_color() {
        let color: Color = ColorDef::Named("Default".to_string()).into();
        assert_eq!(color, Color::Reset);

        let color: Color = ColorDef::Named("Reset".to_string()).into();
        assert_eq!(color, Color::Reset);
    }

    #[test]
    fn test_hex_color_def() {
        let color: Color = ColorDef::Named("#6a50ff".to_string()).into();
        assert_eq!(color, Color::Rgb(106, 80, 255));
    }

    #[test]
    fn test_color_to_hex() {
        assert_eq!(color_to_hex(Color::Rgb(106, 80, 255)).as_deref(), Some("#6a50ff"));
        assert_eq!(color_to_hex(Color::Black).as_deref(), Some("#000000"));
        assert_eq!(color_to_hex(Color::Reset), None);
    }

    #[test]
    fn test_load_theme_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mine.json");
        std::fs::write(
            &path,
            r##"{
                "name": "mine",
                "fg": {"base": "White", "muted": "Gray", "subtle": "DarkGray", "selected": [1, 2, 3]},
                "bg": {"base": "Black", "subtle": "#101010"},
                "accent": {"primary": "Blue", "secondary": "Cyan", "border_focus": "LightBlue"},
                "status": {"info": "Blue", "success": "Green", "warning": "Yellow", "error": "Red"},
                "terminal": {}
            }"##,
        )
        .unwrap();

        let theme = Theme::from_file(&path).unwrap();
        assert_eq!(theme.name, "mine");
        assert_eq!(theme.fg_selected, Color::Rgb(1, 2, 3));
        assert_eq!(theme.bg_subtle, Color::Rgb(16, 16, 16));
        assert_eq!(theme.terminal_bg, Color::Reset);
    }

    #[test]
    fn test_malformed_theme_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Theme::from_file(&path).is_err());
    }
}
