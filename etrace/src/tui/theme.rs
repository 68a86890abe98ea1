//! TUI color theme
//!
//! Color scheme for the terminal interface

use ratatui::style::Color;

pub const HUD_GREEN: Color = Color::Rgb(0, 255, 0);
pub const CRITICAL_RED: Color = Color::Rgb(255, 0, 0);
pub const CAUTION_AMBER: Color = Color::Rgb(255, 191, 0);
pub const INFO_DIM: Color = Color::Rgb(0, 180, 0);
pub const BACKGROUND: Color = Color::Rgb(0, 20, 0);

/// Color for an event log line: writes stand out, counter events are dim
#[must_use]
pub fn log_line_color(line: &str) -> Color {
    if line.starts_with("mem write") {
        CAUTION_AMBER
    } else if line.starts_with("event") {
        INFO_DIM
    } else {
        HUD_GREEN
    }
}
