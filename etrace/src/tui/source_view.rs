//! Source panel centred on the current line.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::ops::Range;

use super::theme::{CAUTION_AMBER, HUD_GREEN, INFO_DIM};

/// Indices of the lines to show so that `current` (0-based) sits in the
/// middle of a panel `height` rows tall.
#[must_use]
pub fn visible_range(total: usize, current: usize, height: usize) -> Range<usize> {
    let start = current.saturating_sub(height / 2).min(total);
    start..(start + height).min(total)
}

/// Draw `lines` with `line` (1-based) highlighted.
///
/// `None` draws an empty panel so nothing stale stays on screen.
pub fn render(f: &mut Frame, area: Rect, title: &str, lines: Option<&[String]>, line: u32) {
    let height = usize::from(area.height.saturating_sub(2));
    let current = (line as usize).saturating_sub(1);

    let text: Vec<Line> = lines
        .map(|lines| {
            visible_range(lines.len(), current, height)
                .map(|idx| {
                    let number = Span::styled(format!("{:5} ", idx + 1), Style::new().fg(INFO_DIM));
                    let body = if idx == current {
                        Span::styled(
                            lines[idx].as_str(),
                            Style::new().fg(CAUTION_AMBER).add_modifier(Modifier::REVERSED),
                        )
                    } else {
                        Span::styled(lines[idx].as_str(), Style::new().fg(HUD_GREEN))
                    };
                    Line::from(vec![number, body])
                })
                .collect()
        })
        .unwrap_or_default();

    let widget = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {title} "))
            .border_style(Style::new().fg(HUD_GREEN)),
    );
    f.render_widget(widget, area);
}
