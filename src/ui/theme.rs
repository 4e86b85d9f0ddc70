//! Theme and styling configuration.
//!
//! A single theme is installed once at startup with [`init_theme`] and read
//! everywhere through [`theme`]. Rendering before initialization falls back
//! to the dark theme.

use std::sync::OnceLock;

use ratatui::style::{Color, Modifier, Style};

static THEME: OnceLock<Theme> = OnceLock::new();

/// Color theme for the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub fg: Color,
    pub bg: Color,
    /// Borders and titles of focused panels.
    pub accent: Color,
    /// Background of the selected row.
    pub highlight: Color,
    pub header: Color,
    pub border: Color,
    pub dim: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            fg: Color::White,
            bg: Color::Reset,
            accent: Color::Cyan,
            highlight: Color::DarkGray,
            header: Color::Yellow,
            border: Color::Gray,
            dim: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
        }
    }

    pub fn light() -> Self {
        Self {
            fg: Color::Black,
            bg: Color::Reset,
            accent: Color::Blue,
            highlight: Color::Gray,
            header: Color::Magenta,
            border: Color::DarkGray,
            dim: Color::Gray,
            success: Color::Green,
            warning: Color::Rgb(176, 112, 0),
            error: Color::Red,
        }
    }

    pub fn header_style(&self) -> Style {
        Style::default().fg(self.header).add_modifier(Modifier::BOLD)
    }

    pub fn selected_style(&self) -> Style {
        Style::default()
            .bg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.accent)
        } else {
            Style::default().fg(self.border)
        }
    }

    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

/// Install the theme. Only the first call has any effect.
pub fn init_theme(theme: Theme) {
    let _ = THEME.set(theme);
}

/// The installed theme.
pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::dark)
}

/// Pick a theme by name (`dark` or `light`).
pub fn load_theme(name: &str) -> Theme {
    match name.to_ascii_lowercase().as_str() {
        "light" => Theme::light(),
        _ => Theme::dark(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_theme_by_name() {
        assert_eq!(load_theme("LIGHT"), Theme::light());
        assert_eq!(load_theme("dark"), Theme::dark());
        assert_eq!(load_theme("unknown"), Theme::dark());
    }

    #[test]
    fn test_theme_is_always_available() {
        assert_eq!(theme().error, Color::Red);
    }

    #[test]
    fn test_border_style_reflects_focus() {
        let t = Theme::dark();
        assert_eq!(t.border_style(true).fg, Some(t.accent));
        assert_eq!(t.border_style(false).fg, Some(t.border));
    }
}
