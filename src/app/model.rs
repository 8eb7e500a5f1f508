//! Per-session state machine
//!
//! [`SessionModel`] is owned by exactly one session loop. `update` applies an
//! event and reports whether the screen needs to be redrawn; `view` draws the
//! current state into a ratatui frame.

use crate::app::event::SessionEvent;
use crate::input::keybindings::{Action, KeyBindings};
use crate::view::help::help_lines;
use crate::view::renderer::Renderer;
use crate::view::theme::Theme;
use crate::view::viewport::{Viewport, HORIZONTAL_CHROME};
use chrono::{DateTime, Local};
use crossterm::event::KeyEvent;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Wrap};
use ratatui::Frame;
use std::sync::Arc;

/// Shown instead of the content when the terminal is below the minimum size
pub const TOO_SMALL_MESSAGE: &str = "Terminal too small to display";

/// Rows reserved under the viewport for the help footer
pub const FOOTER_HEIGHT: u16 = 4;

pub const DEFAULT_MIN_WIDTH: u16 = 80;
pub const DEFAULT_MIN_HEIGHT: u16 = 24;

/// Largest window accepted from a client. Bigger sizes are clamped so one
/// session cannot request an unbounded frame buffer.
pub const MAX_WIDTH: u16 = 1000;
pub const MAX_HEIGHT: u16 = 500;

const TIME_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %Z";

/// Clamp a client-reported window size to [`MAX_WIDTH`] x [`MAX_HEIGHT`]
pub fn clamp_size(width: u32, height: u32) -> (u16, u16) {
    let clamp = |value: u32, max: u16| u16::try_from(value).map_or(max, |v| v.min(max));
    (clamp(width, MAX_WIDTH), clamp(height, MAX_HEIGHT))
}

/// Capabilities shared by every session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Reserve a footer for the key help
    pub show_help: bool,
    /// Markdown document shown in the bio view
    pub content: Arc<str>,
    pub min_width: u16,
    pub min_height: u16,
}

impl SessionOptions {
    pub fn new(content: Arc<str>) -> Self {
        Self {
            show_help: true,
            content,
            min_width: DEFAULT_MIN_WIDTH,
            min_height: DEFAULT_MIN_HEIGHT,
        }
    }
}

/// Pseudo-terminal negotiated by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyInfo {
    pub term: String,
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Content visible and interactive
    Running,
    /// Placeholder shown, only quit is accepted
    TooSmall,
    /// Loop finished; further events are ignored
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveView {
    Bio,
    /// Terminal type, window size and clock
    Info,
}

/// Outcome of [`SessionModel::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    Unchanged,
    Redraw,
    /// A quit key was pressed
    Quit,
    Disconnected,
}

pub struct SessionModel {
    term: String,
    width: u16,
    height: u16,
    now: DateTime<Local>,
    viewport: Viewport,
    show_all_help: bool,
    view: ActiveView,
    state: SessionState,
    options: Arc<SessionOptions>,
    bindings: Arc<KeyBindings>,
    renderer: Arc<Renderer>,
}

impl SessionModel {
    pub fn new(
        pty: &PtyInfo,
        now: DateTime<Local>,
        options: Arc<SessionOptions>,
        bindings: Arc<KeyBindings>,
        renderer: Arc<Renderer>,
    ) -> Self {
        let mut model = Self {
            term: pty.term.clone(),
            width: 0,
            height: 0,
            now,
            viewport: Viewport::new(),
            show_all_help: false,
            view: ActiveView::Bio,
            state: SessionState::Running,
            options,
            bindings,
            renderer,
        };
        model.apply_size(pty.width, pty.height);
        model
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn view_mode(&self) -> ActiveView {
        self.view
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn now(&self) -> DateTime<Local> {
        self.now
    }

    pub fn show_all_help(&self) -> bool {
        self.show_all_help
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    fn is_adequate(&self) -> bool {
        self.width >= self.options.min_width && self.height >= self.options.min_height
    }

    fn viewport_height(&self) -> u16 {
        if self.options.show_help {
            self.height.saturating_sub(FOOTER_HEIGHT)
        } else {
            self.height
        }
    }

    fn apply_size(&mut self, width: u16, height: u16) {
        (self.width, self.height) = clamp_size(width.into(), height.into());

        if !self.is_adequate() {
            self.state = SessionState::TooSmall;
            return;
        }

        self.state = SessionState::Running;
        self.viewport.set_height(self.viewport_height());
        self.refresh_content();
    }

    /// Re-render the document for the current width. Failures keep the
    /// previous lines.
    fn refresh_content(&mut self) {
        let wrap_width = i32::from(self.width) - i32::from(HORIZONTAL_CHROME);
        match self.renderer.render(&self.options.content, wrap_width) {
            Ok(lines) => self.viewport.set_content(lines),
            Err(e) => tracing::warn!(error = %e, wrap_width, "Render failed, keeping previous content"),
        }
    }

    /// Apply one event
    pub fn update(&mut self, event: SessionEvent) -> Update {
        if self.state == SessionState::Terminated {
            return Update::Unchanged;
        }

        match event {
            SessionEvent::Tick(now) => {
                self.now = now;
                if self.state == SessionState::Running && self.view == ActiveView::Info {
                    Update::Redraw
                } else {
                    Update::Unchanged
                }
            }
            SessionEvent::Resize { width, height } => {
                self.apply_size(width, height);
                Update::Redraw
            }
            SessionEvent::Key(key) => self.handle_key(&key),
            SessionEvent::Disconnect => {
                self.state = SessionState::Terminated;
                Update::Disconnected
            }
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> Update {
        let Some(action) = self.bindings.resolve(key) else {
            return Update::Unchanged;
        };

        if action == Action::Quit {
            self.state = SessionState::Terminated;
            return Update::Quit;
        }

        if self.state != SessionState::Running {
            return Update::Unchanged;
        }

        match action {
            Action::ToggleHelp => {
                self.show_all_help = !self.show_all_help;
                Update::Redraw
            }
            Action::ToggleView => {
                self.view = match self.view {
                    ActiveView::Bio => ActiveView::Info,
                    ActiveView::Info => ActiveView::Bio,
                };
                Update::Redraw
            }
            _ if self.view != ActiveView::Bio => Update::Unchanged,
            _ => self.scroll(action),
        }
    }

    fn scroll(&mut self, action: Action) -> Update {
        let before = self.viewport.offset();
        match action {
            Action::ScrollUp => self.viewport.line_up(1),
            Action::ScrollDown => self.viewport.line_down(1),
            Action::PageUp => self.viewport.page_up(),
            Action::PageDown => self.viewport.page_down(),
            Action::HalfPageUp => self.viewport.half_page_up(),
            Action::HalfPageDown => self.viewport.half_page_down(),
            Action::GotoTop => self.viewport.goto_top(),
            Action::GotoBottom => self.viewport.goto_bottom(),
            Action::ToggleView | Action::ToggleHelp | Action::Quit => {}
        }

        if self.viewport.offset() == before {
            Update::Unchanged
        } else {
            Update::Redraw
        }
    }

    /// Draw the current state
    pub fn view(&self, frame: &mut Frame) {
        let area = frame.area();
        let theme = self.renderer.theme();

        match self.state {
            SessionState::TooSmall => {
                let placeholder = Paragraph::new(TOO_SMALL_MESSAGE)
                    .style(Style::default().fg(theme.placeholder_fg))
                    .wrap(Wrap { trim: true });
                frame.render_widget(placeholder, area);
            }
            SessionState::Running => {
                let (main, footer) = if self.options.show_help {
                    let [main, footer] =
                        Layout::vertical([Constraint::Min(0), Constraint::Length(FOOTER_HEIGHT)])
                            .areas(area);
                    (main, Some(footer))
                } else {
                    (area, None)
                };

                match self.view {
                    ActiveView::Bio => self.viewport.render(frame, main, theme),
                    ActiveView::Info => self.render_info(frame, main, theme),
                }

                if let Some(footer) = footer {
                    let help = help_lines(&self.bindings, self.show_all_help, theme);
                    frame.render_widget(Paragraph::new(help), footer);
                }
            }
            SessionState::Terminated => {}
        }
    }

    fn render_info(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let label = Style::default().fg(theme.info_label_fg);
        let lines = vec![
            Line::styled(format!("Your term is {}", self.term), label),
            Line::styled(
                format!("Your window size is x: {} y: {}", self.width, self.height),
                label,
            ),
            Line::styled(format!("Time: {}", self.now.format(TIME_FORMAT)), label),
            Line::default(),
            Line::styled("Press 'q' to quit", Style::default().fg(theme.help_desc_fg)),
        ];

        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme.border_fg))
            .padding(Padding::horizontal(1));
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}
