//! Colors and styles.

use ratatui::style::{Color, Modifier, Style};

pub(crate) const PRIMARY: Color = Color::Rgb(0x7C, 0x3A, 0xED);
pub(crate) const SECONDARY: Color = Color::Rgb(0xA7, 0x8B, 0xFA);
pub(crate) const ACCENT: Color = Color::Rgb(0x10, 0xB9, 0x81);
pub(crate) const ERROR: Color = Color::Rgb(0xEF, 0x44, 0x44);
pub(crate) const MUTED: Color = Color::Rgb(0x6B, 0x72, 0x80);
pub(crate) const TEXT: Color = Color::Rgb(0xE5, 0xE7, 0xEB);

pub(crate) const SPINNER_FRAMES: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

pub(crate) fn title() -> Style {
    Style::new().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub(crate) fn selected() -> Style {
    Style::new().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub(crate) fn normal() -> Style {
    Style::new().fg(TEXT)
}

pub(crate) fn dim() -> Style {
    Style::new().fg(MUTED)
}

pub(crate) fn error() -> Style {
    Style::new().fg(ERROR).add_modifier(Modifier::BOLD)
}

pub(crate) fn success() -> Style {
    Style::new().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub(crate) fn spinner() -> Style {
    Style::new().fg(SECONDARY)
}

pub(crate) fn border() -> Style {
    Style::new().fg(PRIMARY)
}

pub(crate) fn spinner_frame(tick: usize) -> &'static str {
    SPINNER_FRAMES[tick % SPINNER_FRAMES.len()]
}
