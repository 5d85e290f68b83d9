//! Colors and styles for the dashboard. Widgets ask for a style by role,
//! never for a raw color.

use std::sync::OnceLock;

use ratatui::style::{Color, Modifier, Style};

use msdash_core::state::ServiceRow;

/// Color roles
#[derive(Clone, Debug)]
pub struct Palette {
    pub frame: Color,
    pub frame_active: Color,
    pub fg: Color,
    pub fg_secondary: Color,
    pub fg_disabled: Color,
    pub running: Color,
    pub busy: Color,
    pub alert: Color,
    pub highlight_bg: Color,
    pub key: Color,
}

impl Palette {
    pub fn dark() -> Self {
        Self {
            frame: Color::Rgb(64, 64, 72),
            frame_active: Color::Rgb(97, 175, 239),
            fg: Color::Rgb(220, 220, 220),
            fg_secondary: Color::Rgb(156, 156, 160),
            fg_disabled: Color::Rgb(98, 98, 104),
            running: Color::Rgb(80, 200, 120),
            busy: Color::Rgb(229, 192, 123),
            alert: Color::Rgb(224, 108, 117),
            highlight_bg: Color::Rgb(40, 70, 110),
            key: Color::Rgb(198, 160, 246),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

/// How a list row is drawn
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Busy,
    Running,
    Stopped,
}

impl RunState {
    pub fn of(row: &ServiceRow<'_>) -> Self {
        if row.busy {
            RunState::Busy
        } else if row.is_running() {
            RunState::Running
        } else {
            RunState::Stopped
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            RunState::Busy => "◐",
            RunState::Running => "●",
            RunState::Stopped => "○",
        }
    }
}

fn palette() -> &'static Palette {
    static PALETTE: OnceLock<Palette> = OnceLock::new();
    PALETTE.get_or_init(Palette::default)
}

fn fg(color: Color) -> Style {
    Style::default().fg(color)
}

pub mod styles {
    use super::*;

    pub fn row(row: &ServiceRow<'_>) -> Style {
        let p = palette();
        fg(match RunState::of(row) {
            RunState::Busy => p.busy,
            RunState::Running => p.running,
            RunState::Stopped => p.fg_disabled,
        })
    }

    pub fn row_icon(row: &ServiceRow<'_>) -> &'static str {
        RunState::of(row).icon()
    }

    pub fn key_hint() -> Style {
        fg(palette().key)
    }

    pub fn border_subtle() -> Style {
        fg(palette().frame)
    }

    pub fn border_focused() -> Style {
        fg(palette().frame_active)
    }

    pub fn selection() -> Style {
        Style::default()
            .bg(palette().highlight_bg)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text() -> Style {
        fg(palette().fg)
    }

    pub fn text_dim() -> Style {
        fg(palette().fg_secondary)
    }

    pub fn text_muted() -> Style {
        fg(palette().fg_disabled)
    }

    /// Titles and focused labels
    pub fn accent_bold() -> Style {
        fg(palette().frame_active).add_modifier(Modifier::BOLD)
    }

    pub fn section_header() -> Style {
        fg(palette().fg).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    }

    pub fn success() -> Style {
        fg(palette().running)
    }

    pub fn warn() -> Style {
        fg(palette().busy)
    }

    pub fn error() -> Style {
        fg(palette().alert)
    }
}
