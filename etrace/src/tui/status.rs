//! Record status panel: where the cursor is and what it resolved to.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::io::{Read, Seek};

use super::theme::{CAUTION_AMBER, CRITICAL_RED, HUD_GREEN, INFO_DIM};
use crate::navigation::{Navigator, Position};

/// The three status lines for the navigator's current position
pub fn status_lines<R: Read + Seek>(nav: &Navigator<R>) -> [String; 3] {
    let record = match nav.position() {
        Position::InExec { record, pc, .. } => {
            let (start, end) = nav.entry().map_or((0, 0), |(_, range)| (range.start, range.end));
            format!(
                "{}: type={} {:x} len={} PC={pc:x} ({start:x}-{end:x})",
                record.index,
                record.type_name(),
                record.record_type,
                record.payload_len
            )
        }
        Position::AtNonExec(record) => format!(
            "{}: type={} {:x} len={}",
            record.index,
            record.type_name(),
            record.record_type,
            record.payload_len
        ),
        Position::NoPosition => match nav.reader_error() {
            Some(err) => format!("end of trace ({err})"),
            None => "end of trace".to_string(),
        },
    };
    let location = nav.location().map_or_else(
        || "file=??:0 ??".to_string(),
        |loc| format!("file={}:{} {}", loc.file, loc.line, loc.symbol),
    );
    [record, location, format!("search={}", nav.search_pattern())]
}

pub fn render<R: Read + Seek>(f: &mut Frame, area: Rect, nav: &Navigator<R>) {
    let [record, location, search] = status_lines(nav);
    let record_style = if matches!(nav.position(), Position::NoPosition) {
        Style::new().fg(CRITICAL_RED)
    } else {
        Style::new().fg(HUD_GREEN).add_modifier(Modifier::REVERSED)
    };

    let lines = vec![
        Line::from(Span::styled(record, record_style)),
        Line::from(Span::styled(location, Style::new().fg(CAUTION_AMBER))),
        Line::from(Span::styled(search, Style::new().fg(INFO_DIM))),
    ];
    let widget = Paragraph::new(lines).block(
        Block::default().borders(Borders::ALL).border_style(Style::new().fg(HUD_GREEN)),
    );
    f.render_widget(widget, area);
}
