//! Color theme for the TUI.
//!
//! Rendering code references semantic roles instead of hardcoded
//! `ratatui::style::Color` values, keeping the palette in one place.

use ratatui::style::Color;

/// All colors used by the splitrun TUI, grouped by semantic role.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Primary text color.
    pub fg: Color,
    /// Muted text: separators, hints, inactive borders.
    pub fg_dim: Color,
    /// Pane headers and accents.
    pub accent: Color,
    /// Selected script list row.
    pub selected_fg: Color,
    pub selected_bg: Color,
    /// Success indicator (finished processes).
    pub success: Color,
    /// Error indicator (failed processes, error text).
    pub error: Color,
    /// Status bar.
    pub status_fg: Color,
    pub status_bg: Color,
    /// Border of the active pane.
    pub border_active: Color,
}

impl Theme {
    /// The built-in palette, mirroring classic terminal color pairs.
    pub fn default_theme() -> Self {
        Self {
            fg: Color::White,
            fg_dim: Color::DarkGray,
            accent: Color::Cyan,
            selected_fg: Color::Black,
            selected_bg: Color::Yellow,
            success: Color::Green,
            error: Color::Red,
            status_fg: Color::White,
            status_bg: Color::Blue,
            border_active: Color::Yellow,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_theme()
    }
}
