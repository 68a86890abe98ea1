//! # Terminal User Interface (TUI)
//!
//! Interactive step-through viewer using `ratatui`.
//!
//! ## Layout
//!
//! ```text
//! ┌ record / location / search ──────────────┐
//! ├ source (current line reversed) ──────────┤
//! ├ event log (newest at the bottom) ────────┤
//! └ keys / last message ─────────────────────┘
//! ```
//!
//! ## View Modes
//!
//! - **Navigate** - Arrow keys step, `n`/`N` repeat the search (default)
//! - **Search** - Text input for a symbol name
//! - **Help** - Keyboard shortcuts
//!
//! Every key press runs at most one navigation command to completion before
//! the next key is read.
//!
//! ## Sub-Modules
//!
//! - `status` - Record, location and search lines
//! - `source_view` - Source panel
//! - `theme` - Color scheme

// TUI rendering intentionally uses precision-losing casts for layout arithmetic
#![allow(clippy::cast_possible_truncation, clippy::too_many_lines)]

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::debug;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction as Split, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use std::io::{self, Read, Seek};

mod source_view;
mod status;
mod theme;

pub use source_view::visible_range;
pub use status::status_lines;
use theme::{log_line_color, BACKGROUND, CAUTION_AMBER, HUD_GREEN, INFO_DIM};

use crate::domain::{Direction, Granularity};
use crate::navigation::{Navigator, SearchOutcome};
use crate::source::SourceCache;

// =============================================================================
// STYLE CONSTANTS
// =============================================================================

const STYLE_HEADING: Style = Style::new().fg(HUD_GREEN).add_modifier(Modifier::BOLD);
const STYLE_DIM: Style = Style::new().fg(INFO_DIM);
const STYLE_KEY: Style = Style::new().fg(CAUTION_AMBER);
const STYLE_TEXT: Style = Style::new().fg(ratatui::style::Color::White);

/// Rows given to the event log panel
const LOG_PANEL_HEIGHT: u16 = 8;

// =============================================================================
// COMMANDS AND VIEW MODES
// =============================================================================

/// A navigation request, independent of the key that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Step(Granularity, Direction),
    RepeatSearch(Direction),
    StartSearch(String),
    Reset,
    RunToEnd,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewMode {
    Navigate,
    /// Text input for the search pattern
    Search,
    Help,
}

// =============================================================================
// APP
// =============================================================================

pub struct App<R> {
    nav: Navigator<R>,
    sources: SourceCache,
    view_mode: ViewMode,
    search_input: String,
    /// Outcome of the last command, shown in the status bar
    message: Option<String>,
    should_quit: bool,
}

impl<R: Read + Seek> App<R> {
    /// Viewer positioned on the first EXEC record of the trace
    #[must_use]
    pub fn new(nav: Navigator<R>, sources: SourceCache) -> Self {
        let mut app = Self {
            nav,
            sources,
            view_mode: ViewMode::Navigate,
            search_input: String::new(),
            message: None,
            should_quit: false,
        };
        app.execute(Command::Reset);
        app
    }

    #[must_use]
    pub fn navigator(&self) -> &Navigator<R> {
        &self.nav
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Run one command to completion
    pub fn execute(&mut self, command: Command) {
        debug!("Command {command:?}");
        self.message = None;
        let landed = match command {
            Command::Step(granularity, dir) => self.nav.step(granularity, dir).is_some(),
            Command::RepeatSearch(dir) => {
                let outcome = self.nav.repeat_search(dir);
                self.report_search(outcome);
                return;
            }
            Command::StartSearch(pattern) => {
                let outcome = self.nav.start_search(&pattern);
                self.report_search(outcome);
                return;
            }
            Command::Reset => self.nav.reset().is_some(),
            Command::RunToEnd => self.nav.run_to_end().is_some(),
            Command::Quit => {
                self.should_quit = true;
                return;
            }
        };
        if !landed {
            self.message = Some("end of trace".to_string());
        }
    }

    fn report_search(&mut self, outcome: SearchOutcome) {
        if !outcome.is_found() {
            self.message = Some("not found".to_string());
        }
    }

    /// Map a key press to a command for the current mode and run it
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.execute(Command::Quit);
            return;
        }

        match self.view_mode {
            ViewMode::Navigate => {
                let command = match key.code {
                    KeyCode::Down => Command::Step(Granularity::Line, Direction::Forward),
                    KeyCode::Up => Command::Step(Granularity::Line, Direction::Backward),
                    KeyCode::Right => Command::Step(Granularity::Symbol, Direction::Forward),
                    KeyCode::Left => Command::Step(Granularity::Symbol, Direction::Backward),
                    KeyCode::Char('n') => Command::RepeatSearch(Direction::Forward),
                    KeyCode::Char('N') => Command::RepeatSearch(Direction::Backward),
                    KeyCode::Char('g') => Command::Reset,
                    KeyCode::Char('G') => Command::RunToEnd,
                    KeyCode::Char('q' | 'Q') => Command::Quit,
                    KeyCode::Char('/') => {
                        self.search_input.clear();
                        self.view_mode = ViewMode::Search;
                        return;
                    }
                    KeyCode::Char('?') => {
                        self.view_mode = ViewMode::Help;
                        return;
                    }
                    _ => return,
                };
                self.execute(command);
            }
            ViewMode::Search => match key.code {
                KeyCode::Esc => {
                    self.search_input.clear();
                    self.view_mode = ViewMode::Navigate;
                }
                KeyCode::Enter => {
                    self.view_mode = ViewMode::Navigate;
                    let pattern = std::mem::take(&mut self.search_input);
                    self.execute(Command::StartSearch(pattern));
                }
                KeyCode::Backspace => {
                    self.search_input.pop();
                }
                KeyCode::Char(c) => self.search_input.push(c),
                _ => {}
            },
            ViewMode::Help => {
                // Any key closes help
                self.view_mode = ViewMode::Navigate;
            }
        }
    }

    /// Run the TUI event loop until quit
    ///
    /// # Errors
    /// Returns an error if terminal setup, rendering or input fails
    pub fn run(mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        // Cleanup terminal, even when the loop failed
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|f| self.draw(f))?;

            // Block until the next key; one command per key
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    self.handle_key(key);
                }
            }
        }
        Ok(())
    }

    fn draw(&mut self, f: &mut ratatui::Frame) {
        let outer_layout = Layout::default()
            .direction(Split::Vertical)
            .constraints([
                Constraint::Length(5),                // Record status
                Constraint::Min(3),                   // Source
                Constraint::Length(LOG_PANEL_HEIGHT), // Event log
                Constraint::Length(3),                // Status bar
            ])
            .split(f.area());

        status::render(f, outer_layout[0], &self.nav);

        let location = self.nav.location().filter(|loc| loc.has_source()).cloned();
        match location {
            Some(loc) => {
                let lines = self.sources.lines_for(&loc.file);
                source_view::render(f, outer_layout[1], &loc.file, lines, loc.line);
            }
            None => source_view::render(f, outer_layout[1], "source", None, 0),
        }

        self.render_log(f, outer_layout[2]);
        self.render_status_bar(f, outer_layout[3]);

        match self.view_mode {
            ViewMode::Search => render_search_overlay(f, f.area(), &self.search_input),
            ViewMode::Help => render_help_overlay(f, f.area()),
            ViewMode::Navigate => {}
        }
    }

    fn render_log(&self, f: &mut ratatui::Frame, area: Rect) {
        let rows = usize::from(area.height.saturating_sub(2));
        let lines: Vec<Line> = self
            .nav
            .log()
            .tail(rows)
            .map(|entry| Line::from(Span::styled(entry, Style::new().fg(log_line_color(entry)))))
            .collect();

        let widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Events ({}) ", self.nav.log().len()))
                .border_style(Style::new().fg(HUD_GREEN)),
        );
        f.render_widget(widget, area);
    }

    fn render_status_bar(&self, f: &mut ratatui::Frame, area: Rect) {
        let mut spans = match self.view_mode {
            ViewMode::Navigate => vec![
                Span::styled("↑↓", STYLE_KEY),
                Span::styled(":Line ", STYLE_DIM),
                Span::styled("←→", STYLE_KEY),
                Span::styled(":Symbol ", STYLE_DIM),
                Span::styled("/", STYLE_KEY),
                Span::styled(":Search ", STYLE_DIM),
                Span::styled("n/N", STYLE_KEY),
                Span::styled(":Next/Prev ", STYLE_DIM),
                Span::styled("?", STYLE_KEY),
                Span::styled(":Help ", STYLE_DIM),
                Span::styled("Q", STYLE_KEY),
                Span::styled(":Quit ", STYLE_DIM),
            ],
            ViewMode::Search => vec![
                Span::styled("Enter", STYLE_KEY),
                Span::styled(":Find ", STYLE_DIM),
                Span::styled("ESC", STYLE_KEY),
                Span::styled(":Cancel ", STYLE_DIM),
                Span::styled("[Search]", STYLE_KEY),
            ],
            ViewMode::Help => vec![
                Span::styled("Any key", STYLE_KEY),
                Span::styled(":Close ", STYLE_DIM),
                Span::styled("[Help]", STYLE_HEADING),
            ],
        };
        if let Some(message) = &self.message {
            spans.push(Span::styled(format!("[{message}]"), STYLE_KEY));
        }

        let status = Paragraph::new(vec![Line::from(spans)]).block(
            Block::default().borders(Borders::ALL).border_style(Style::default().fg(HUD_GREEN)),
        );
        f.render_widget(status, area);
    }
}

// =============================================================================
// OVERLAY RENDERERS
// =============================================================================

fn render_help_overlay(f: &mut ratatui::Frame, area: Rect) {
    let popup_area = centered_popup(area, 70, 18);

    let key_line = |key: &'static str, what: &'static str| {
        Line::from(vec![Span::styled(format!("  {key:<8}"), STYLE_KEY), Span::styled(what, STYLE_TEXT)])
    };
    let help_text = vec![
        Line::from(""),
        Line::from(Span::styled("  Stepping", STYLE_HEADING)),
        key_line("↓ / ↑", "Next / previous source line"),
        key_line("→ / ←", "Next / previous function"),
        key_line("g", "Back to the first instruction"),
        key_line("G", "Run to the last instruction"),
        Line::from(""),
        Line::from(Span::styled("  Searching", STYLE_HEADING)),
        key_line("/", "Find a function by name, forward"),
        key_line("n / N", "Next / previous occurrence"),
        Line::from(""),
        key_line("q", "Quit"),
        Line::from(""),
        Line::from(Span::styled("  Press any key to close", STYLE_DIM)),
    ];

    let help_widget = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .style(Style::new().bg(BACKGROUND).fg(HUD_GREEN)),
    );

    f.render_widget(ratatui::widgets::Clear, popup_area);
    f.render_widget(help_widget, popup_area);
}

fn render_search_overlay(f: &mut ratatui::Frame, area: Rect, query: &str) {
    let popup_area = centered_popup(area, 60, 3);

    let search_widget = Paragraph::new(format!("/{query}_"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Find Function ")
                .style(Style::new().bg(BACKGROUND).fg(HUD_GREEN)),
        )
        .style(Style::new().fg(CAUTION_AMBER));

    f.render_widget(ratatui::widgets::Clear, popup_area);
    f.render_widget(search_widget, popup_area);
}

/// Create a centered popup area with given width percentage and height in lines
fn centered_popup(area: Rect, width_percent: u16, height_lines: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Split::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(height_lines), Constraint::Fill(1)])
        .split(area);

    Layout::default()
        .direction(Split::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}
